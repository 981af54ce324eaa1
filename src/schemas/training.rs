use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::TrainingWorkflow;
use crate::db::types::WorkflowStatus;

/// Staff-graded essay: criterion name → selected option name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TrainingExample {
    pub(crate) answer: String,
    pub(crate) options_selected: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TrainingCreate {
    pub(crate) rubric: serde_json::Value,
    #[serde(default)]
    pub(crate) examples: Vec<TrainingExample>,
    #[validate(length(min = 1, max = 255, message = "course_id must contain 1..255 characters"))]
    pub(crate) course_id: String,
    #[validate(length(min = 1, max = 255, message = "item_id must contain 1..255 characters"))]
    pub(crate) item_id: String,
    #[validate(length(min = 1, max = 128, message = "algorithm_id must contain 1..128 characters"))]
    pub(crate) algorithm_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct WorkflowCreatedResponse {
    pub(crate) workflow_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TrainingWorkflowResponse {
    pub(crate) id: String,
    pub(crate) rubric_id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) status: WorkflowStatus,
    pub(crate) example_count: usize,
    pub(crate) classifier_set_id: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: String,
    pub(crate) completed_at: Option<String>,
}

impl TrainingWorkflowResponse {
    pub(crate) fn from_db(workflow: TrainingWorkflow) -> Self {
        Self {
            id: workflow.id,
            rubric_id: workflow.rubric_id,
            course_id: workflow.course_id,
            item_id: workflow.item_id,
            algorithm_id: workflow.algorithm_id,
            status: workflow.status,
            example_count: workflow.training_examples.0.len(),
            classifier_set_id: workflow.classifier_set_id,
            error: workflow.error,
            created_at: format_primitive(workflow.created_at),
            completed_at: workflow.completed_at.map(format_primitive),
        }
    }
}
