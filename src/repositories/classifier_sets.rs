use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{ClassifierRow, ClassifierSetRow};

const CLASSIFIER_SET_COLUMNS: &str = "id, rubric_id, algorithm_id, created_at";

pub(crate) struct CreateClassifierSet<'a> {
    pub(crate) id: &'a str,
    pub(crate) rubric_id: &'a str,
    pub(crate) algorithm_id: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn insert_set(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateClassifierSet<'_>,
) -> Result<ClassifierSetRow, sqlx::Error> {
    sqlx::query_as::<_, ClassifierSetRow>(&format!(
        "INSERT INTO classifier_sets (id, rubric_id, algorithm_id, created_at)
         VALUES ($1,$2,$3,$4)
         RETURNING {CLASSIFIER_SET_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.rubric_id)
    .bind(params.algorithm_id)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn insert_classifiers(
    executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    classifier_set_id: &str,
    classifiers: &[(String, Vec<u8>)],
) -> Result<(), sqlx::Error> {
    for (criterion_name, payload) in classifiers {
        sqlx::query(
            "INSERT INTO classifiers (classifier_set_id, criterion_name, payload)
             VALUES ($1,$2,$3)",
        )
        .bind(classifier_set_id)
        .bind(criterion_name)
        .bind(payload)
        .execute(&mut **executor)
        .await?;
    }

    Ok(())
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    classifier_set_id: &str,
) -> Result<Option<ClassifierSetRow>, sqlx::Error> {
    sqlx::query_as::<_, ClassifierSetRow>(&format!(
        "SELECT {CLASSIFIER_SET_COLUMNS} FROM classifier_sets WHERE id = $1"
    ))
    .bind(classifier_set_id)
    .fetch_optional(pool)
    .await
}

/// Most recently created set for the pair; insertion order breaks timestamp ties.
pub(crate) async fn find_latest(
    pool: &PgPool,
    rubric_id: &str,
    algorithm_id: &str,
) -> Result<Option<ClassifierSetRow>, sqlx::Error> {
    sqlx::query_as::<_, ClassifierSetRow>(&format!(
        "SELECT {CLASSIFIER_SET_COLUMNS} FROM classifier_sets
         WHERE rubric_id = $1 AND algorithm_id = $2
         ORDER BY created_at DESC, seq DESC
         LIMIT 1"
    ))
    .bind(rubric_id)
    .bind(algorithm_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_classifiers(
    pool: &PgPool,
    classifier_set_id: &str,
) -> Result<Vec<ClassifierRow>, sqlx::Error> {
    sqlx::query_as::<_, ClassifierRow>(
        "SELECT criterion_name, payload FROM classifiers
         WHERE classifier_set_id = $1
         ORDER BY criterion_name",
    )
    .bind(classifier_set_id)
    .fetch_all(pool)
    .await
}
