use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::schemas::grading::AssessmentResponse;
use crate::schemas::submission::{SubmissionCreate, SubmissionResponse};
use crate::services::grading::get_latest_assessment;
use crate::services::submissions::NewSubmission;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_submission))
        .route("/:submission_id", get(get_submission))
        .route("/:submission_id/assessment", get(get_assessment))
}

async fn create_submission(
    State(state): State<AppState>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission = state
        .submissions()
        .create(NewSubmission {
            id: uuid::Uuid::new_v4().to_string(),
            course_id: payload.course_id,
            item_id: payload.item_id,
            student_id: payload.student_id,
            answer: payload.answer,
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create submission"))?;

    tracing::info!(
        submission_id = %submission.id,
        course_id = %submission.course_id,
        item_id = %submission.item_id,
        "Submission created"
    );

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

async fn get_submission(
    Path(submission_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = state
        .submissions()
        .find(&submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(SubmissionResponse::from_db(submission)))
}

async fn get_assessment(
    Path(submission_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let assessment = get_latest_assessment(&state, &submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No assessment for submission".to_string()))?;

    Ok(Json(AssessmentResponse::from_db(assessment)))
}
