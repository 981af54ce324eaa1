use axum::extract::{Query, State};
use axum::{routing::get, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::grading::GradingWorkflowResponse;
use crate::schemas::training::TrainingWorkflowResponse;
use crate::schemas::workflow::{IncompleteWorkflowsResponse, ScopeParams};
use crate::tasks::reschedule::{reschedule_unfinished, RescheduleSummary};

pub(crate) fn reschedule_router() -> Router<AppState> {
    Router::new().route("/", post(reschedule))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/incomplete", get(list_incomplete))
}

async fn reschedule(
    State(state): State<AppState>,
    Json(payload): Json<ScopeParams>,
) -> Result<Json<RescheduleSummary>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let summary = reschedule_unfinished(&state, &payload.course_id, &payload.item_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reschedule unfinished workflows"))?;

    Ok(Json(summary))
}

async fn list_incomplete(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Json<IncompleteWorkflowsResponse>, ApiError> {
    params.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let training = state
        .workflows()
        .list_incomplete_training(&params.course_id, &params.item_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list training workflows"))?;
    let grading = state
        .workflows()
        .list_incomplete_grading(&params.course_id, &params.item_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list grading workflows"))?;

    Ok(Json(IncompleteWorkflowsResponse {
        course_id: params.course_id,
        item_id: params.item_id,
        training: training.into_iter().map(TrainingWorkflowResponse::from_db).collect(),
        grading: grading.into_iter().map(GradingWorkflowResponse::from_db).collect(),
    }))
}
