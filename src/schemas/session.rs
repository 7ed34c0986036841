use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::AssessmentSession;

#[derive(Debug, Serialize)]
pub(crate) struct StartAssessmentResponse {
    pub(crate) session_id: String,
    pub(crate) assessment_id: String,
    pub(crate) started_at: String,
    pub(crate) duration_minutes: i32,
    pub(crate) max_score: f64,
    pub(crate) resumed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteAssessmentRequest {
    #[serde(default)]
    #[serde(alias = "autoSubmitted")]
    pub(crate) auto_submitted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) assessment_id: String,
    pub(crate) student_email: String,
    pub(crate) total_score: f64,
    pub(crate) max_score: f64,
    pub(crate) percentage: i32,
    pub(crate) started_at: String,
    pub(crate) completed_at: Option<String>,
    pub(crate) time_spent_minutes: Option<i32>,
}

impl SessionResponse {
    pub(crate) fn from_db(session: AssessmentSession) -> Self {
        Self {
            id: session.id,
            assessment_id: session.assessment_id,
            student_email: session.student_email,
            total_score: session.total_score,
            max_score: session.max_score,
            percentage: session.percentage,
            started_at: format_primitive(session.started_at),
            completed_at: session.completed_at.map(format_primitive),
            time_spent_minutes: session.time_spent_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentStatsResponse {
    pub(crate) assigned: usize,
    pub(crate) started: usize,
    pub(crate) in_progress: usize,
    pub(crate) completed: usize,
    pub(crate) average_percentage: Option<i32>,
    pub(crate) total_score: f64,
    pub(crate) total_max_score: f64,
}
