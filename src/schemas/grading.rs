use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Assessment, AssessmentPart, GradingWorkflow};
use crate::db::types::WorkflowStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradingCreate {
    #[validate(length(min = 1, max = 36, message = "submission_id must contain 1..36 characters"))]
    pub(crate) submission_id: String,
    pub(crate) rubric: serde_json::Value,
    #[validate(length(min = 1, max = 128, message = "algorithm_id must contain 1..128 characters"))]
    pub(crate) algorithm_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradingWorkflowResponse {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) rubric_id: String,
    pub(crate) algorithm_id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) status: WorkflowStatus,
    pub(crate) classifier_set_id: Option<String>,
    pub(crate) assessment_id: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: String,
    pub(crate) completed_at: Option<String>,
}

impl GradingWorkflowResponse {
    pub(crate) fn from_db(workflow: GradingWorkflow) -> Self {
        Self {
            id: workflow.id,
            submission_id: workflow.submission_id,
            rubric_id: workflow.rubric_id,
            algorithm_id: workflow.algorithm_id,
            course_id: workflow.course_id,
            item_id: workflow.item_id,
            status: workflow.status,
            classifier_set_id: workflow.classifier_set_id,
            assessment_id: workflow.assessment_id,
            error: workflow.error,
            created_at: format_primitive(workflow.created_at),
            completed_at: workflow.completed_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssessmentResponse {
    pub(crate) id: String,
    pub(crate) submission_id: String,
    pub(crate) rubric_id: String,
    pub(crate) scorer_id: String,
    pub(crate) score_type: String,
    pub(crate) points_earned: i32,
    pub(crate) points_possible: i32,
    pub(crate) created_at: String,
    pub(crate) parts: Vec<AssessmentPart>,
}

impl AssessmentResponse {
    pub(crate) fn from_db(assessment: Assessment) -> Self {
        Self {
            id: assessment.id,
            submission_id: assessment.submission_id,
            rubric_id: assessment.rubric_id,
            scorer_id: assessment.scorer_id,
            score_type: assessment.score_type,
            points_earned: assessment.points_earned,
            points_possible: assessment.points_possible,
            created_at: format_primitive(assessment.created_at),
            parts: assessment.parts,
        }
    }
}
