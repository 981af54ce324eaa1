use sqlx::types::Json as SqlxJson;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{ScoredExample, TrainingWorkflow};
use crate::db::types::WorkflowStatus;

const TRAINING_COLUMNS: &str = "id, rubric_id, course_id, item_id, algorithm_id, \
    training_examples, status, classifier_set_id, error, created_at, completed_at";

pub(crate) struct CreateTrainingWorkflow<'a> {
    pub(crate) id: &'a str,
    pub(crate) rubric_id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) item_id: &'a str,
    pub(crate) algorithm_id: &'a str,
    pub(crate) training_examples: &'a [ScoredExample],
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateTrainingWorkflow<'_>,
) -> Result<TrainingWorkflow, sqlx::Error> {
    sqlx::query_as::<_, TrainingWorkflow>(&format!(
        "INSERT INTO training_workflows (
            id, rubric_id, course_id, item_id, algorithm_id, training_examples, status, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
         RETURNING {TRAINING_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.rubric_id)
    .bind(params.course_id)
    .bind(params.item_id)
    .bind(params.algorithm_id)
    .bind(SqlxJson(params.training_examples))
    .bind(WorkflowStatus::Pending)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    workflow_id: &str,
) -> Result<Option<TrainingWorkflow>, sqlx::Error> {
    sqlx::query_as::<_, TrainingWorkflow>(&format!(
        "SELECT {TRAINING_COLUMNS} FROM training_workflows WHERE id = $1"
    ))
    .bind(workflow_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_incomplete(
    pool: &PgPool,
    course_id: &str,
    item_id: &str,
) -> Result<Vec<TrainingWorkflow>, sqlx::Error> {
    sqlx::query_as::<_, TrainingWorkflow>(&format!(
        "SELECT {TRAINING_COLUMNS} FROM training_workflows
         WHERE course_id = $1 AND item_id = $2 AND status = $3
         ORDER BY created_at, id"
    ))
    .bind(course_id)
    .bind(item_id)
    .bind(WorkflowStatus::Pending)
    .fetch_all(pool)
    .await
}

/// Links the classifier set and completes the workflow. Returns `false` when
/// the workflow was no longer pending.
pub(crate) async fn mark_complete(
    executor: impl sqlx::PgExecutor<'_>,
    workflow_id: &str,
    classifier_set_id: &str,
    completed_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE training_workflows
         SET status = $1, classifier_set_id = $2, completed_at = $3
         WHERE id = $4 AND status = $5",
    )
    .bind(WorkflowStatus::Complete)
    .bind(classifier_set_id)
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
        "UPDATE training_workflows
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
