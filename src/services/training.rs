use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::rubric::Rubric;
use crate::schemas::training::TrainingExample;
use crate::services::errors::ServiceError;
use crate::services::task_queue::TaskKind;
use crate::services::workflow_store::NewTrainingWorkflow;

pub(crate) struct TrainingSubmission<'a> {
    pub(crate) rubric: serde_json::Value,
    pub(crate) examples: &'a [TrainingExample],
    pub(crate) course_id: &'a str,
    pub(crate) item_id: &'a str,
    pub(crate) algorithm_id: &'a str,
}

/// Validates the request, records a pending training workflow and dispatches it.
///
/// Nothing is persisted when validation fails. A dispatch failure is reported
/// as internal but the workflow row stays behind for the rescheduling sweep.
pub(crate) async fn submit_training(
    state: &AppState,
    submission: TrainingSubmission<'_>,
) -> Result<String, ServiceError> {
    let rubric = Rubric::from_value(submission.rubric)
        .map_err(|err| ServiceError::request(format!("Invalid rubric: {err}")))?;
    let training_examples = rubric
        .score_examples(submission.examples)
        .map_err(|err| ServiceError::request(format!("Invalid training examples: {err}")))?;
    if !state.algorithms().contains(submission.algorithm_id) {
        return Err(ServiceError::request(format!(
            "Unknown algorithm '{}'",
            submission.algorithm_id
        )));
    }

    let record = state
        .workflows()
        .save_rubric(&rubric)
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to save rubric"))?;

    let workflow = state
        .workflows()
        .create_training_workflow(NewTrainingWorkflow {
            id: uuid::Uuid::new_v4().to_string(),
            rubric_id: record.id,
            course_id: submission.course_id.to_string(),
            item_id: submission.item_id.to_string(),
            algorithm_id: submission.algorithm_id.to_string(),
            training_examples,
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to create training workflow"))?;

    tracing::info!(
        workflow_id = %workflow.id,
        course_id = %workflow.course_id,
        item_id = %workflow.item_id,
        algorithm_id = %workflow.algorithm_id,
        examples = workflow.training_examples.0.len(),
        "Training workflow created"
    );

    state
        .queue()
        .dispatch(TaskKind::TrainClassifiers, &workflow.id)
        .await
        .map_err(|err| ServiceError::internal(err, "Failed to schedule training task"))?;

    Ok(workflow.id)
}
