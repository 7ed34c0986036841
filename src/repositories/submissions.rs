use sqlx::PgPool;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

const COLUMNS: &str = "\
    id, assessment_id, question_index, student_email, answer, language, status, \
    score, feedback, execution_time_ms, memory_used_kb, submitted_at, evaluated_at, \
    created_at, updated_at";

pub(crate) struct UpsertSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) question_index: i32,
    pub(crate) student_email: &'a str,
    pub(crate) answer: &'a str,
    pub(crate) language: Option<&'a str>,
    pub(crate) submitted_at: time::PrimitiveDateTime,
}

/// One submission per (assessment, question, student); re-submitting
/// overwrites the previous attempt and resets it to `pending` ahead of
/// re-evaluation. The stored row id survives overwrites.
pub(crate) async fn upsert(
    pool: &PgPool,
    params: UpsertSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, assessment_id, question_index, student_email, answer, language,
            status, score, submitted_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,0,$8,$8,$8)
        ON CONFLICT (assessment_id, question_index, student_email) DO UPDATE SET
            answer = EXCLUDED.answer,
            language = EXCLUDED.language,
            status = EXCLUDED.status,
            score = 0,
            feedback = NULL,
            execution_time_ms = NULL,
            memory_used_kb = NULL,
            submitted_at = EXCLUDED.submitted_at,
            evaluated_at = NULL,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.assessment_id)
    .bind(params.question_index)
    .bind(params.student_email)
    .bind(params.answer)
    .bind(params.language)
    .bind(SubmissionStatus::Pending)
    .bind(params.submitted_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct RecordEvaluation {
    pub(crate) status: SubmissionStatus,
    pub(crate) score: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) execution_time_ms: Option<i64>,
    pub(crate) memory_used_kb: Option<i64>,
    pub(crate) evaluated_at: time::PrimitiveDateTime,
}

pub(crate) async fn record_evaluation(
    pool: &PgPool,
    id: &str,
    params: RecordEvaluation,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE submissions SET
            status = $1,
            score = $2,
            feedback = $3,
            execution_time_ms = $4,
            memory_used_kb = $5,
            evaluated_at = $6,
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.status)
    .bind(params.score)
    .bind(params.feedback)
    .bind(params.execution_time_ms)
    .bind(params.memory_used_kb)
    .bind(params.evaluated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    assessment_id: &str,
    student_email: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions \
         WHERE assessment_id = $1 AND student_email = $2 \
         ORDER BY question_index"
    ))
    .bind(assessment_id)
    .bind(student_email)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_assessment(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions \
         WHERE assessment_id = $1 \
         ORDER BY student_email, question_index"
    ))
    .bind(assessment_id)
    .fetch_all(pool)
    .await
}

/// The session total is always recomputed from the full submission set, so
/// a crash between scoring and the session update self-heals on the next
/// scored submission.
pub(crate) async fn sum_scores(
    pool: &PgPool,
    assessment_id: &str,
    student_email: &str,
) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(score), 0) FROM submissions \
         WHERE assessment_id = $1 AND student_email = $2",
    )
    .bind(assessment_id)
    .bind(student_email)
    .fetch_one(pool)
    .await
}
