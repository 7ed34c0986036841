use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{Difficulty, Question, QuestionMix, SubmissionStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: Option<String>,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assessment {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) topic: String,
    pub(crate) language: String,
    pub(crate) difficulty: Difficulty,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Json<Vec<Question>>,
    pub(crate) question_mix: Json<QuestionMix>,
    pub(crate) assigned_emails: Json<Vec<String>>,
    pub(crate) created_by: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Assessment {
    pub(crate) fn is_assigned_to(&self, email: &str) -> bool {
        self.assigned_emails.0.iter().any(|assigned| assigned == email)
    }
}

/// One student's timed attempt at one assessment. Open iff `completed_at`
/// is absent; expiry is detected lazily on the next write, never by a timer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AssessmentSession {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) student_email: String,
    pub(crate) total_score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) time_spent_minutes: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl AssessmentSession {
    pub(crate) fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) question_index: i32,
    pub(crate) student_email: String,
    pub(crate) answer: String,
    pub(crate) language: Option<String>,
    pub(crate) status: SubmissionStatus,
    pub(crate) score: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) execution_time_ms: Option<i64>,
    pub(crate) memory_used_kb: Option<i64>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) evaluated_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
