use sqlx::types::Json as SqlxJson;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::RubricRecord;
use crate::schemas::rubric::Rubric;

const RUBRIC_COLUMNS: &str = "id, content_hash, body, created_at";

pub(crate) struct UpsertRubric<'a> {
    pub(crate) id: &'a str,
    pub(crate) content_hash: &'a str,
    pub(crate) body: &'a Rubric,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Inserts the rubric unless an identical one exists; returns the stored row either way.
pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertRubric<'_>,
) -> Result<RubricRecord, sqlx::Error> {
    sqlx::query_as::<_, RubricRecord>(&format!(
        "INSERT INTO rubrics (id, content_hash, body, created_at)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (content_hash) DO UPDATE SET content_hash = EXCLUDED.content_hash
         RETURNING {RUBRIC_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.content_hash)
    .bind(SqlxJson(params.body))
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    rubric_id: &str,
) -> Result<Option<RubricRecord>, sqlx::Error> {
    sqlx::query_as::<_, RubricRecord>(&format!(
        "SELECT {RUBRIC_COLUMNS} FROM rubrics WHERE id = $1"
    ))
    .bind(rubric_id)
    .fetch_optional(pool)
    .await
}
