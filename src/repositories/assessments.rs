use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{AssessmentPart, AssessmentRow};

const ASSESSMENT_COLUMNS: &str = "id, submission_id, rubric_id, scorer_id, score_type, \
    points_earned, points_possible, created_at";

pub(crate) const AI_SCORE_TYPE: &str = "AI";

pub(crate) struct CreateAssessment<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: &'a str,
    pub(crate) rubric_id: &'a str,
    pub(crate) scorer_id: &'a str,
    pub(crate) points_earned: i32,
    pub(crate) points_possible: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn insert(
    executor: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    params: CreateAssessment<'_>,
    parts: &[AssessmentPart],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO assessments (
            id, submission_id, rubric_id, scorer_id, score_type,
            points_earned, points_possible, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(params.id)
    .bind(params.submission_id)
    .bind(params.rubric_id)
    .bind(params.scorer_id)
    .bind(AI_SCORE_TYPE)
    .bind(params.points_earned)
    .bind(params.points_possible)
    .bind(params.created_at)
    .execute(&mut **executor)
    .await?;

    for (order_index, part) in parts.iter().enumerate() {
        sqlx::query(
            "INSERT INTO assessment_parts (
                assessment_id, order_index, criterion_name, option_name, points, raw_score
             ) VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(params.id)
        .bind(order_index as i32)
        .bind(&part.criterion_name)
        .bind(&part.option_name)
        .bind(part.points)
        .bind(part.raw_score)
        .execute(&mut **executor)
        .await?;
    }

    Ok(())
}

pub(crate) async fn find_latest_for_submission(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Option<AssessmentRow>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentRow>(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM assessments
         WHERE submission_id = $1 AND score_type = $2
         ORDER BY created_at DESC, seq DESC
         LIMIT 1"
    ))
    .bind(submission_id)
    .bind(AI_SCORE_TYPE)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_parts(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<AssessmentPart>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentPart>(
        "SELECT criterion_name, option_name, points, raw_score
         FROM assessment_parts
         WHERE assessment_id = $1
         ORDER BY order_index",
    )
    .bind(assessment_id)
    .fetch_all(pool)
    .await
}
