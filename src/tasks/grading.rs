use std::time::Instant;

use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::AssessmentPart;
use crate::services::workflow_store::NewAssessment;
use crate::tasks::TaskOutcome;

/// Scores the essay snapshot with each criterion's classifier and records the assessment.
pub(crate) async fn grade_essay(state: &AppState, workflow_id: &str) -> Result<TaskOutcome> {
    let timer = Instant::now();
    let workflow = state
        .workflows()
        .find_grading_workflow(workflow_id)
        .await
        .context("Failed to load grading workflow")?
        .with_context(|| format!("Grading workflow {workflow_id} not found"))?;

    if workflow.status.is_terminal() {
        tracing::info!(workflow_id, status = ?workflow.status, "Grading already finished; skipping");
        return Ok(record(TaskOutcome::Skipped, timer));
    }

    let Some(classifier_set_id) = workflow.classifier_set_id.as_deref() else {
        tracing::error!(
            workflow_id,
            submission_id = %workflow.submission_id,
            "Grading dispatched before a classifier set was assigned"
        );
        anyhow::bail!("Grading workflow {workflow_id} has no classifier set");
    };

    let classifier_set = state
        .workflows()
        .find_classifier_set(classifier_set_id)
        .await
        .context("Failed to load classifier set")?
        .with_context(|| format!("Classifier set {classifier_set_id} not found"))?;

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

    let mut parts = Vec::with_capacity(rubric.criteria.len());
    for criterion in &rubric.criteria {
        let Some(classifier) = classifier_set.classifier(&criterion.name) else {
            let message = format!("No classifier for criterion '{}'", criterion.name);
            return fail(state, workflow_id, &message, timer).await;
        };

        let raw_score = match algorithm.score(&workflow.essay_text, classifier).await {
            Ok(score) => score,
            Err(err) => {
                let message = format!("Criterion '{}': {err}", criterion.name);
                return fail(state, workflow_id, &message, timer).await;
            }
        };

        let Some(option) = criterion.closest_option(raw_score) else {
            let message = format!("Criterion '{}' has no options", criterion.name);
            return fail(state, workflow_id, &message, timer).await;
        };
        parts.push(AssessmentPart {
            criterion_name: criterion.name.clone(),
            option_name: option.name.clone(),
            points: option.points,
            raw_score,
        });
    }

    let points_earned = parts.iter().map(|part| part.points).sum();
    let assessment = NewAssessment {
        id: uuid::Uuid::new_v4().to_string(),
        submission_id: workflow.submission_id.clone(),
        rubric_id: workflow.rubric_id.clone(),
        scorer_id: workflow.algorithm_id.clone(),
        points_earned,
        points_possible: rubric.points_possible(),
        created_at: primitive_now_utc(),
        parts,
    };
    let assessment_id = assessment.id.clone();

    let completed = state
        .workflows()
        .complete_grading(workflow_id, assessment)
        .await
        .context("Failed to record assessment")?;

    if !completed {
        tracing::info!(workflow_id, "Grading workflow finished concurrently; result discarded");
        return Ok(record(TaskOutcome::Skipped, timer));
    }

    tracing::info!(
        workflow_id,
        submission_id = %workflow.submission_id,
        assessment_id = %assessment_id,
        points_earned,
        "Grading completed"
    );
    Ok(record(TaskOutcome::Completed, timer))
}

async fn fail(
    state: &AppState,
    workflow_id: &str,
    message: &str,
    timer: Instant,
) -> Result<TaskOutcome> {
    let updated = state
        .workflows()
        .fail_grading(workflow_id, message, primitive_now_utc())
        .await
        .context("Failed to mark grading workflow failed")?;

    if !updated {
        return Ok(record(TaskOutcome::Skipped, timer));
    }

    tracing::warn!(workflow_id, error = %message, "Grading failed");
    Ok(record(TaskOutcome::Failed, timer))
}

fn record(outcome: TaskOutcome, timer: Instant) -> TaskOutcome {
    metrics::counter!("grading_jobs_total", "status" => outcome.as_str()).increment(1);
    metrics::histogram!("grading_job_duration_seconds").record(timer.elapsed().as_secs_f64());
    outcome
}
