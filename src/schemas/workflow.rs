use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::grading::GradingWorkflowResponse;
use crate::schemas::training::TrainingWorkflowResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ScopeParams {
    #[validate(length(min = 1, max = 255, message = "course_id must contain 1..255 characters"))]
    pub(crate) course_id: String,
    #[validate(length(min = 1, max = 255, message = "item_id must contain 1..255 characters"))]
    pub(crate) item_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct IncompleteWorkflowsResponse {
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) training: Vec<TrainingWorkflowResponse>,
    pub(crate) grading: Vec<GradingWorkflowResponse>,
}
