use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStudent, CurrentTeacher};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::session::StudentStatsResponse;
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct StudentListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_students)).route("/me/stats", get(my_stats))
}

async fn list_students(
    Query(params): Query<StudentListQuery>,
    CurrentTeacher(_teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let items =
        repositories::users::list_by_role(state.db(), UserRole::Student, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    let total_count = repositories::users::count_by_role(state.db(), UserRole::Student)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;

    let items = items.into_iter().map(UserResponse::from_db).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip: params.skip, limit: params.limit }))
}

/// Aggregates the student's own sessions; open sessions count as started
/// but contribute no percentage (lazy expiry means an abandoned session can
/// stay open indefinitely).
async fn my_stats(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentStatsResponse>, ApiError> {
    let assigned = repositories::assessments::list_assigned(state.db(), &student.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assigned assessments"))?;

    let sessions = repositories::sessions::list_by_student(state.db(), &student.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list sessions"))?;

    let started = sessions.len();
    let completed: Vec<_> = sessions.iter().filter(|session| !session.is_open()).collect();
    let in_progress = started - completed.len();

    let average_percentage = if completed.is_empty() {
        None
    } else {
        let sum: i64 = completed.iter().map(|session| session.percentage as i64).sum();
        Some((sum as f64 / completed.len() as f64).round() as i32)
    };

    let total_score = sessions.iter().map(|session| session.total_score).sum();
    let total_max_score = sessions.iter().map(|session| session.max_score).sum();

    Ok(Json(StudentStatsResponse {
        assigned: assigned.len(),
        started,
        in_progress,
        completed: completed.len(),
        average_percentage,
        total_score,
        total_max_score,
    }))
}

#[cfg(test)]
mod tests;
