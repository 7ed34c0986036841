use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAnswerRequest {
    #[validate(length(min = 1, message = "answer must not be empty"))]
    pub(crate) answer: String,
    #[serde(default)]
    pub(crate) language: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAnswerResponse {
    pub(crate) submission_id: String,
    pub(crate) question_index: i32,
    pub(crate) status: SubmissionStatus,
    pub(crate) score: f64,
    pub(crate) max_score: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) evaluated: bool,
    pub(crate) session_total_score: f64,
    pub(crate) session_percentage: i32,
    pub(crate) message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RunCodeRequest {
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) language: Option<String>,
    #[serde(default)]
    pub(crate) stdin: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunCodeResponse {
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) execution_time_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
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
    pub(crate) submitted_at: String,
    pub(crate) evaluated_at: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            assessment_id: submission.assessment_id,
            question_index: submission.question_index,
            student_email: submission.student_email,
            answer: submission.answer,
            language: submission.language,
            status: submission.status,
            score: submission.score,
            feedback: submission.feedback,
            execution_time_ms: submission.execution_time_ms,
            memory_used_kb: submission.memory_used_kb,
            submitted_at: format_primitive(submission.submitted_at),
            evaluated_at: submission.evaluated_at.map(format_primitive),
        }
    }
}
