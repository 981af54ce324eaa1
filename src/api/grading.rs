use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::grading::{GradingCreate, GradingWorkflowResponse};
use crate::schemas::training::WorkflowCreatedResponse;
use crate::services::grading::{submit_grading, GradingSubmission};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(create_grading)).route("/:workflow_id", get(get_grading))
}

async fn create_grading(
    State(state): State<AppState>,
    Json(payload): Json<GradingCreate>,
) -> Result<(StatusCode, Json<WorkflowCreatedResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let workflow_id = submit_grading(
        &state,
        GradingSubmission {
            submission_id: &payload.submission_id,
            rubric: payload.rubric,
            algorithm_id: &payload.algorithm_id,
        },
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(WorkflowCreatedResponse { workflow_id })))
}

async fn get_grading(
    Path(workflow_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<GradingWorkflowResponse>, ApiError> {
    let workflow = state
        .workflows()
        .find_grading_workflow(&workflow_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grading workflow"))?
        .ok_or_else(|| ApiError::NotFound("Grading workflow not found".to_string()))?;

    Ok(Json(GradingWorkflowResponse::from_db(workflow)))
}
