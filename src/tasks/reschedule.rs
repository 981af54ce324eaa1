use serde::Serialize;
use thiserror::Error;

use crate::core::state::AppState;
use crate::services::errors::StoreError;
use crate::services::retry::{Exhausted, RetryPolicy};
use crate::services::task_queue::{DispatchError, TaskKind};

/// Extra attempts granted to each sweep pass after its first failure.
pub(crate) const MAX_RESCHEDULE_RETRIES: u32 = 1;

const RETRY_POLICY: RetryPolicy = RetryPolicy::new(MAX_RESCHEDULE_RETRIES);

#[derive(Debug, Error)]
pub(crate) enum SweepStepError {
    #[error("failed to list incomplete workflows: {0}")]
    List(#[source] StoreError),
    #[error("failed to look up classifier set for workflow {workflow_id}: {source}")]
    Lookup { workflow_id: String, source: StoreError },
    #[error("failed to assign classifier set to workflow {workflow_id}: {source}")]
    Assign { workflow_id: String, source: StoreError },
    #[error("failed to dispatch workflow {workflow_id}: {source}")]
    Dispatch { workflow_id: String, source: DispatchError },
}

#[derive(Debug, Error)]
pub(crate) enum RescheduleError {
    #[error("training reschedule failed after {attempts} attempts: {source}")]
    Training { attempts: u32, source: SweepStepError },
    #[error("grading reschedule failed after {attempts} attempts: {source}")]
    Grading { attempts: u32, source: SweepStepError },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct TrainingPass {
    pub(crate) found: usize,
    pub(crate) dispatched: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct GradingPass {
    pub(crate) found: usize,
    pub(crate) dispatched: usize,
    pub(crate) classifier_sets_assigned: usize,
    /// Pending workflows whose (rubric, algorithm) still has no classifier set.
    pub(crate) awaiting_classifiers: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct RescheduleSummary {
    pub(crate) training_found: usize,
    pub(crate) training_dispatched: usize,
    /// True when pending training held grading back for this sweep.
    pub(crate) grading_deferred: bool,
    pub(crate) grading_found: usize,
    pub(crate) grading_dispatched: usize,
    pub(crate) classifier_sets_assigned: usize,
    pub(crate) grading_awaiting_classifiers: usize,
}

/// Re-drives stalled workflows for one (course, item) scope.
///
/// Training goes first; grading is only rescheduled once no training workflow
/// in the scope is pending, so grading never runs ahead of its classifiers.
/// Safe to run repeatedly and concurrently with workers.
pub(crate) async fn reschedule_unfinished(
    state: &AppState,
    course_id: &str,
    item_id: &str,
) -> Result<RescheduleSummary, RescheduleError> {
    let result = sweep(state, course_id, item_id).await;
    let status = match &result {
        Ok(summary) if summary.grading_deferred => "deferred",
        Ok(_) => "ok",
        Err(_) => "error",
    };
    metrics::counter!("reschedule_runs_total", "status" => status).increment(1);
    result
}

async fn sweep(
    state: &AppState,
    course_id: &str,
    item_id: &str,
) -> Result<RescheduleSummary, RescheduleError> {
    let training = reschedule_training(state, course_id, item_id).await?;
    let mut summary = RescheduleSummary {
        training_found: training.found,
        training_dispatched: training.dispatched,
        ..RescheduleSummary::default()
    };

    if training.found > 0 {
        tracing::info!(
            course_id,
            item_id,
            pending_training = training.found,
            "Training still pending; grading reschedule deferred"
        );
        summary.grading_deferred = true;
        return Ok(summary);
    }

    let grading = reschedule_grading(state, course_id, item_id).await?;
    summary.grading_found = grading.found;
    summary.grading_dispatched = grading.dispatched;
    summary.classifier_sets_assigned = grading.classifier_sets_assigned;
    summary.grading_awaiting_classifiers = grading.awaiting_classifiers;

    tracing::info!(
        course_id,
        item_id,
        grading_found = grading.found,
        grading_dispatched = grading.dispatched,
        classifier_sets_assigned = grading.classifier_sets_assigned,
        "Rescheduling sweep finished"
    );
    Ok(summary)
}

/// Dispatches every pending training workflow in scope, retrying the whole pass once.
pub(crate) async fn reschedule_training(
    state: &AppState,
    course_id: &str,
    item_id: &str,
) -> Result<TrainingPass, RescheduleError> {
    RETRY_POLICY
        .run("reschedule_training", |attempt| training_pass(state, course_id, item_id, attempt))
        .await
        .map_err(|Exhausted { attempts, last_error }| RescheduleError::Training {
            attempts,
            source: last_error,
        })
}

/// Attaches classifiers to pending grading workflows and dispatches those that have them.
pub(crate) async fn reschedule_grading(
    state: &AppState,
    course_id: &str,
    item_id: &str,
) -> Result<GradingPass, RescheduleError> {
    RETRY_POLICY
        .run("reschedule_grading", |attempt| grading_pass(state, course_id, item_id, attempt))
        .await
        .map_err(|Exhausted { attempts, last_error }| RescheduleError::Grading {
            attempts,
            source: last_error,
        })
}

async fn training_pass(
    state: &AppState,
    course_id: &str,
    item_id: &str,
    attempt: u32,
) -> Result<TrainingPass, SweepStepError> {
    let workflows = state
        .workflows()
        .list_incomplete_training(course_id, item_id)
        .await
        .map_err(SweepStepError::List)?;

    let mut pass = TrainingPass { found: workflows.len(), dispatched: 0 };
    for workflow in &workflows {
        state.queue().dispatch(TaskKind::TrainClassifiers, &workflow.id).await.map_err(
            |source| SweepStepError::Dispatch { workflow_id: workflow.id.clone(), source },
        )?;
        pass.dispatched += 1;
    }

    tracing::debug!(course_id, item_id, attempt, found = pass.found, "Training pass done");
    Ok(pass)
}

async fn grading_pass(
    state: &AppState,
    course_id: &str,
    item_id: &str,
    attempt: u32,
) -> Result<GradingPass, SweepStepError> {
    let workflows = state
        .workflows()
        .list_incomplete_grading(course_id, item_id)
        .await
        .map_err(SweepStepError::List)?;

    let mut pass = GradingPass { found: workflows.len(), ..GradingPass::default() };
    for workflow in &workflows {
        if workflow.classifier_set_id.is_none() {
            let latest = state
                .workflows()
                .latest_classifier_set(&workflow.rubric_id, &workflow.algorithm_id)
                .await
                .map_err(|source| SweepStepError::Lookup {
                    workflow_id: workflow.id.clone(),
                    source,
                })?;

            let Some(classifier_set) = latest else {
                tracing::debug!(
                    workflow_id = %workflow.id,
                    "No classifier set yet; leaving grading workflow pending"
                );
                pass.awaiting_classifiers += 1;
                continue;
            };

            let assigned = state
                .workflows()
                .assign_classifier_set(&workflow.id, &classifier_set.id)
                .await
                .map_err(|source| SweepStepError::Assign {
                    workflow_id: workflow.id.clone(),
                    source,
                })?;
            if assigned {
                pass.classifier_sets_assigned += 1;
            }
        }

        state.queue().dispatch(TaskKind::GradeEssay, &workflow.id).await.map_err(|source| {
            SweepStepError::Dispatch { workflow_id: workflow.id.clone(), source }
        })?;
        pass.dispatched += 1;
    }

    tracing::debug!(course_id, item_id, attempt, found = pass.found, "Grading pass done");
    Ok(pass)
}
