use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ScoredExample;
use crate::services::algorithm::ExampleEssay;
use crate::services::classifier_sets::create_classifier_set;
use crate::tasks::TaskOutcome;

/// Trains one classifier per rubric criterion and completes the workflow.
///
/// Duplicate deliveries of a finished workflow are no-ops. Any algorithm error,
/// including an unreachable service, fails the workflow for good.
pub(crate) async fn train_classifiers(state: &AppState, workflow_id: &str) -> Result<TaskOutcome> {
    let timer = Instant::now();
    let workflow = state
        .workflows()
        .find_training_workflow(workflow_id)
        .await
        .context("Failed to load training workflow")?
        .with_context(|| format!("Training workflow {workflow_id} not found"))?;

    if workflow.status.is_terminal() {
        tracing::info!(workflow_id, status = ?workflow.status, "Training already finished; skipping");
        return Ok(record(TaskOutcome::Skipped, timer));
    }

    let rubric = state
        .workflows()
        .find_rubric(&workflow.rubric_id)
        .await
        .context("Failed to load rubric")?
        .with_context(|| format!("Rubric {} not found", workflow.rubric_id))?
        .body
        .0;

    let Some(algorithm) = state.algorithms().get(&workflow.algorithm_id) else {
        let message = format!("Unknown algorithm '{}'", workflow.algorithm_id);
        return fail(state, workflow_id, &message, timer).await;
    };

    let mut classifiers = BTreeMap::new();
    for criterion in &rubric.criteria {
        let examples = match examples_for(&workflow.training_examples.0, &criterion.name) {
            Ok(examples) => examples,
            Err(message) => return fail(state, workflow_id, &message, timer).await,
        };

        tracing::debug!(
            workflow_id,
            criterion = %criterion.name,
            examples = examples.len(),
            "Training criterion"
        );
        match algorithm.train(&examples).await {
            Ok(classifier) => {
                classifiers.insert(criterion.name.clone(), classifier);
            }
            Err(err) => {
                let message = format!("Criterion '{}': {err}", criterion.name);
                return fail(state, workflow_id, &message, timer).await;
            }
        }
    }

    let Some(classifier_set) = create_classifier_set(
        state.workflows(),
        workflow_id,
        classifiers,
        &workflow.rubric_id,
        &rubric,
        &workflow.algorithm_id,
    )
    .await
    .context("Failed to store classifier set")?
    else {
        tracing::info!(workflow_id, "Training workflow finished concurrently; result discarded");
        return Ok(record(TaskOutcome::Skipped, timer));
    };

    tracing::info!(
        workflow_id,
        course_id = %workflow.course_id,
        item_id = %workflow.item_id,
        classifier_set_id = %classifier_set.id,
        "Training completed"
    );
    Ok(record(TaskOutcome::Completed, timer))
}

/// `(text, score)` pairs for one criterion, in submission order.
fn examples_for(
    examples: &[ScoredExample],
    criterion_name: &str,
) -> Result<Vec<ExampleEssay>, String> {
    examples
        .iter()
        .enumerate()
        .map(|(index, example)| {
            example
                .scores
                .get(criterion_name)
                .map(|score| ExampleEssay { text: example.text.clone(), score: *score })
                .ok_or_else(|| {
                    format!("Example {index} has no score for criterion '{criterion_name}'")
                })
        })
        .collect()
}

async fn fail(
    state: &AppState,
    workflow_id: &str,
    message: &str,
    timer: Instant,
) -> Result<TaskOutcome> {
    let updated = state
        .workflows()
        .fail_training(workflow_id, message, primitive_now_utc())
        .await
        .context("Failed to mark training workflow failed")?;

    if !updated {
        return Ok(record(TaskOutcome::Skipped, timer));
    }

    tracing::warn!(workflow_id, error = %message, "Training failed");
    Ok(record(TaskOutcome::Failed, timer))
}

fn record(outcome: TaskOutcome, timer: Instant) -> TaskOutcome {
    metrics::counter!("training_jobs_total", "status" => outcome.as_str()).increment(1);
    metrics::histogram!("training_job_duration_seconds").record(timer.elapsed().as_secs_f64());
    outcome
}
