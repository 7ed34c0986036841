use sqlx::PgPool;

use crate::db::models::AssessmentSession;

const COLUMNS: &str = "\
    id, assessment_id, student_email, total_score, max_score, percentage, \
    started_at, completed_at, time_spent_minutes, created_at, updated_at";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) student_email: &'a str,
    pub(crate) max_score: f64,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

/// Insert guarded by the (assessment, student) uniqueness constraint; a
/// false return means a concurrent start won and the caller should re-fetch.
pub(crate) async fn create(
    pool: &PgPool,
    session: CreateSession<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO assessment_sessions (
            id, assessment_id, student_email, total_score, max_score, percentage,
            started_at, created_at, updated_at
        ) VALUES ($1,$2,$3,0,$4,0,$5,$6,$7)
        ON CONFLICT DO NOTHING",
    )
    .bind(session.id)
    .bind(session.assessment_id)
    .bind(session.student_email)
    .bind(session.max_score)
    .bind(session.started_at)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_pair(
    pool: &PgPool,
    assessment_id: &str,
    student_email: &str,
) -> Result<Option<AssessmentSession>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentSession>(&format!(
        "SELECT {COLUMNS} FROM assessment_sessions \
         WHERE assessment_id = $1 AND student_email = $2"
    ))
    .bind(assessment_id)
    .bind(student_email)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn fetch_one_by_pair(
    pool: &PgPool,
    assessment_id: &str,
    student_email: &str,
) -> Result<AssessmentSession, sqlx::Error> {
    sqlx::query_as::<_, AssessmentSession>(&format!(
        "SELECT {COLUMNS} FROM assessment_sessions \
         WHERE assessment_id = $1 AND student_email = $2"
    ))
    .bind(assessment_id)
    .bind(student_email)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_email: &str,
) -> Result<Vec<AssessmentSession>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentSession>(&format!(
        "SELECT {COLUMNS} FROM assessment_sessions \
         WHERE student_email = $1 ORDER BY started_at DESC"
    ))
    .bind(student_email)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_assessment(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<AssessmentSession>, sqlx::Error> {
    sqlx::query_as::<_, AssessmentSession>(&format!(
        "SELECT {COLUMNS} FROM assessment_sessions \
         WHERE assessment_id = $1 ORDER BY started_at"
    ))
    .bind(assessment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn update_score(
    pool: &PgPool,
    id: &str,
    total_score: f64,
    percentage: i32,
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assessment_sessions \
         SET total_score = $1, percentage = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(total_score)
    .bind(percentage)
    .bind(updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Completion is guarded on the session still being open, which makes the
/// lazy force-complete on an expired session idempotent: only the first
/// write sets `completed_at`.
pub(crate) async fn complete_if_open(
    pool: &PgPool,
    id: &str,
    completed_at: time::PrimitiveDateTime,
    time_spent_minutes: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assessment_sessions \
         SET completed_at = $1, time_spent_minutes = $2, updated_at = $1 \
         WHERE id = $3 AND completed_at IS NULL",
    )
    .bind(completed_at)
    .bind(time_spent_minutes)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
