use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Submission;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionCreate {
    #[validate(length(min = 1, max = 255, message = "course_id must contain 1..255 characters"))]
    pub(crate) course_id: String,
    #[validate(length(min = 1, max = 255, message = "item_id must contain 1..255 characters"))]
    pub(crate) item_id: String,
    #[validate(length(min = 1, max = 255, message = "student_id must contain 1..255 characters"))]
    pub(crate) student_id: String,
    #[validate(length(min = 1, message = "answer must not be empty"))]
    pub(crate) answer: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) student_id: String,
    pub(crate) answer: String,
    pub(crate) created_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            course_id: submission.course_id,
            item_id: submission.item_id,
            student_id: submission.student_id,
            answer: submission.answer,
            created_at: format_primitive(submission.created_at),
        }
    }
}
