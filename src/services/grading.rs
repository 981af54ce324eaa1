use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Assessment;
use crate::schemas::rubric::Rubric;
use crate::services::errors::ServiceError;
use crate::services::task_queue::TaskKind;
use crate::services::workflow_store::NewGradingWorkflow;

pub(crate) struct GradingSubmission<'a> {
    pub(crate) submission_id: &'a str,
    pub(crate) rubric: serde_json::Value,
    pub(crate) algorithm_id: &'a str,
}

/// Records a pending grading workflow for the submission.
///
/// The workflow is bound to the newest classifier set for (rubric, algorithm)
/// when one exists and dispatched immediately; otherwise it waits for the
/// rescheduling sweep to attach classifiers once training completes.
pub(crate) async fn submit_grading(
    state: &AppState,
    submission: GradingSubmission<'_>,
) -> Result<String, ServiceError> {
    let rubric = Rubric::from_value(submission.rubric)
        .map_err(|err| ServiceError::request(format!("Invalid rubric: {err}")))?;
    if !state.algorithms().contains(submission.algorithm_id) {
        return Err(ServiceError::request(format!(
            "Unknown algorithm '{}'",
            submission.algorithm_id
        )));
    }

    let essay = state
        .submissions()
        .find(submission.submission_id)
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to load submission"))?
        .ok_or_else(|| {
            ServiceError::request(format!("Unknown submission '{}'", submission.submission_id))
        })?;

    let record = state
        .workflows()
        .save_rubric(&rubric)
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to save rubric"))?;

    let classifier_set = state
        .workflows()
        .latest_classifier_set(&record.id, submission.algorithm_id)
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to look up classifier set"))?;

    let workflow = state
        .workflows()
        .create_grading_workflow(NewGradingWorkflow {
            id: uuid::Uuid::new_v4().to_string(),
            submission_id: essay.id,
            rubric_id: record.id,
            algorithm_id: submission.algorithm_id.to_string(),
            course_id: essay.course_id,
            item_id: essay.item_id,
            essay_text: essay.answer,
            classifier_set_id: classifier_set.map(|set| set.id),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to create grading workflow"))?;

    tracing::info!(
        workflow_id = %workflow.id,
        submission_id = %workflow.submission_id,
        course_id = %workflow.course_id,
        item_id = %workflow.item_id,
        classifier_set_id = ?workflow.classifier_set_id,
        "Grading workflow created"
    );

    if workflow.classifier_set_id.is_none() {
        tracing::info!(
            workflow_id = %workflow.id,
            "No classifier set yet; grading deferred until training completes"
        );
        return Ok(workflow.id);
    }

    state
        .queue()
        .dispatch(TaskKind::GradeEssay, &workflow.id)
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to schedule grading task"))?;

    Ok(workflow.id)
}

pub(crate) async fn get_latest_assessment(
    state: &AppState,
    submission_id: &str,
) -> Result<Option<Assessment>, ServiceError> {
    state
        .workflows()
        .latest_assessment(submission_id)
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to load assessment"))
}
