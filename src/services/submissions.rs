use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::repositories;
use crate::services::errors::StoreError;

#[derive(Debug, Clone)]
pub(crate) struct NewSubmission {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) item_id: String,
    pub(crate) student_id: String,
    pub(crate) answer: String,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Learner submissions, resolved by id to their essay text and scope.
#[async_trait]
pub(crate) trait SubmissionStore: Send + Sync {
    async fn create(&self, submission: NewSubmission) -> Result<Submission, StoreError>;

    async fn find(&self, submission_id: &str) -> Result<Option<Submission>, StoreError>;
}

#[derive(Debug, Clone)]
pub(crate) struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn create(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        let created = repositories::submissions::create(
            &self.pool,
            repositories::submissions::CreateSubmission {
                id: &submission.id,
                course_id: &submission.course_id,
                item_id: &submission.item_id,
                student_id: &submission.student_id,
                answer: &submission.answer,
                created_at: submission.created_at,
            },
        )
        .await?;
        Ok(created)
    }

    async fn find(&self, submission_id: &str) -> Result<Option<Submission>, StoreError> {
        Ok(repositories::submissions::find_by_id(&self.pool, submission_id).await?)
    }
}
