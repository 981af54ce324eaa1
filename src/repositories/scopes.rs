use sqlx::PgPool;

use crate::db::models::WorkflowScope;
use crate::db::types::WorkflowStatus;

pub(crate) async fn list_incomplete(pool: &PgPool) -> Result<Vec<WorkflowScope>, sqlx::Error> {
    sqlx::query_as::<_, WorkflowScope>(
        "SELECT course_id, item_id FROM training_workflows WHERE status = $1
         UNION
         SELECT course_id, item_id FROM grading_workflows WHERE status = $1
         ORDER BY course_id, item_id",
    )
    .bind(WorkflowStatus::Pending)
    .fetch_all(pool)
    .await
}
