use sqlx::PgPool;

use crate::db::models::Assessment;
use crate::db::types::{Difficulty, Question, QuestionMix};

const COLUMNS: &str = "\
    id, title, topic, language, difficulty, duration_minutes, questions, \
    question_mix, assigned_emails, created_by, is_active, created_at, updated_at";

pub(crate) struct CreateAssessment<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) topic: &'a str,
    pub(crate) language: &'a str,
    pub(crate) difficulty: Difficulty,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: &'a [Question],
    pub(crate) question_mix: &'a QuestionMix,
    pub(crate) assigned_emails: &'a [String],
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssessment<'_>,
) -> Result<Assessment, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "INSERT INTO assessments (
            id, title, topic, language, difficulty, duration_minutes, questions,
            question_mix, assigned_emails, created_by, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,TRUE,$11,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.topic)
    .bind(params.language)
    .bind(params.difficulty)
    .bind(params.duration_minutes)
    .bind(sqlx::types::Json(params.questions))
    .bind(sqlx::types::Json(params.question_mix))
    .bind(sqlx::types::Json(params.assigned_emails))
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!("SELECT {COLUMNS} FROM assessments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Active-only lookup used by the student paths; soft-deleted assessments
/// are indistinguishable from missing ones here.
pub(crate) async fn find_active_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {COLUMNS} FROM assessments WHERE id = $1 AND is_active"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_creator(
    pool: &PgPool,
    created_by: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {COLUMNS} FROM assessments \
         WHERE created_by = $1 AND is_active \
         ORDER BY created_at DESC OFFSET $2 LIMIT $3"
    ))
    .bind(created_by)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_creator(
    pool: &PgPool,
    created_by: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE created_by = $1 AND is_active")
        .bind(created_by)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_assigned(
    pool: &PgPool,
    email: &str,
) -> Result<Vec<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {COLUMNS} FROM assessments \
         WHERE is_active AND assigned_emails @> $1 \
         ORDER BY created_at DESC"
    ))
    .bind(sqlx::types::Json(vec![email.to_lowercase()]))
    .fetch_all(pool)
    .await
}

pub(crate) async fn soft_delete(
    pool: &PgPool,
    id: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE assessments SET is_active = FALSE, updated_at = $1 WHERE id = $2")
            .bind(updated_at)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_assigned_emails(
    pool: &PgPool,
    id: &str,
    assigned_emails: &[String],
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE assessments SET assigned_emails = $1, updated_at = $2 WHERE id = $3")
        .bind(sqlx::types::Json(assigned_emails))
        .bind(updated_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
