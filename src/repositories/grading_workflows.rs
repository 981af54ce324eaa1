use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::GradingWorkflow;
use crate::db::types::WorkflowStatus;

const GRADING_COLUMNS: &str = "id, submission_id, rubric_id, algorithm_id, course_id, item_id, \
    essay_text, classifier_set_id, status, assessment_id, error, created_at, completed_at";

pub(crate) struct CreateGradingWorkflow<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: &'a str,
    pub(crate) rubric_id: &'a str,
    pub(crate) algorithm_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) item_id: &'a str,
    pub(crate) essay_text: &'a str,
    pub(crate) classifier_set_id: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateGradingWorkflow<'_>,
) -> Result<GradingWorkflow, sqlx::Error> {
    sqlx::query_as::<_, GradingWorkflow>(&format!(
        "INSERT INTO grading_workflows (
            id, submission_id, rubric_id, algorithm_id, course_id, item_id,
            essay_text, classifier_set_id, status, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         RETURNING {GRADING_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.rubric_id)
    .bind(params.algorithm_id)
    .bind(params.course_id)
    .bind(params.item_id)
    .bind(params.essay_text)
    .bind(params.classifier_set_id)
    .bind(WorkflowStatus::Pending)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    workflow_id: &str,
) -> Result<Option<GradingWorkflow>, sqlx::Error> {
    sqlx::query_as::<_, GradingWorkflow>(&format!(
        "SELECT {GRADING_COLUMNS} FROM grading_workflows WHERE id = $1"
    ))
    .bind(workflow_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_incomplete(
    pool: &PgPool,
    course_id: &str,
    item_id: &str,
) -> Result<Vec<GradingWorkflow>, sqlx::Error> {
    sqlx::query_as::<_, GradingWorkflow>(&format!(
        "SELECT {GRADING_COLUMNS} FROM grading_workflows
         WHERE course_id = $1 AND item_id = $2 AND status = $3
         ORDER BY created_at, id"
    ))
    .bind(course_id)
    .bind(item_id)
    .bind(WorkflowStatus::Pending)
    .fetch_all(pool)
    .await
}

/// Sets the classifier set only while none is assigned. Returns `false` on no-op.
pub(crate) async fn assign_classifier_set(
    pool: &PgPool,
    workflow_id: &str,
    classifier_set_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE grading_workflows
         SET classifier_set_id = $1
         WHERE id = $2 AND status = $3 AND classifier_set_id IS NULL",
    )
    .bind(classifier_set_id)
    .bind(workflow_id)
    .bind(WorkflowStatus::Pending)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn mark_complete(
    executor: impl sqlx::PgExecutor<'_>,
    workflow_id: &str,
    assessment_id: &str,
    completed_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE grading_workflows
         SET status = $1, assessment_id = $2, completed_at = $3
         WHERE id = $4 AND status = $5",
    )
    .bind(WorkflowStatus::Complete)
    .bind(assessment_id)
    .bind(completed_at)
    .bind(workflow_id)
    .bind(WorkflowStatus::Pending)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn mark_failed(
    pool: &PgPool,
    workflow_id: &str,
    error: &str,
    completed_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE grading_workflows
         SET status = $1, error = $2, completed_at = $3
         WHERE id = $4 AND status = $5",
    )
    .bind(WorkflowStatus::Failed)
    .bind(error)
    .bind(completed_at)
    .bind(workflow_id)
    .bind(WorkflowStatus::Pending)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
