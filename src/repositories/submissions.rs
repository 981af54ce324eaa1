use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Submission;

const SUBMISSION_COLUMNS: &str = "id, course_id, item_id, student_id, answer, created_at";

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) item_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (id, course_id, item_id, student_id, answer, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.item_id)
    .bind(params.student_id)
    .bind(params.answer)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
    ))
    .bind(submission_id)
    .fetch_optional(pool)
    .await
}
