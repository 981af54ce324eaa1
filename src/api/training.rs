use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::training::{TrainingCreate, TrainingWorkflowResponse, WorkflowCreatedResponse};
use crate::services::training::{submit_training, TrainingSubmission};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(create_training)).route("/:workflow_id", get(get_training))
}

async fn create_training(
    State(state): State<AppState>,
    Json(payload): Json<TrainingCreate>,
) -> Result<(StatusCode, Json<WorkflowCreatedResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let workflow_id = submit_training(
        &state,
        TrainingSubmission {
            rubric: payload.rubric,
            examples: &payload.examples,
            course_id: &payload.course_id,
            item_id: &payload.item_id,
            algorithm_id: &payload.algorithm_id,
        },
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(WorkflowCreatedResponse { workflow_id })))
}

async fn get_training(
    Path(workflow_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TrainingWorkflowResponse>, ApiError> {
    let workflow = state
        .workflows()
        .find_training_workflow(&workflow_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load training workflow"))?
        .ok_or_else(|| ApiError::NotFound("Training workflow not found".to_string()))?;

    Ok(Json(TrainingWorkflowResponse::from_db(workflow)))
}
