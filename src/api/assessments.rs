use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{
    fetch_assessment_for_student, fetch_owned_assessment, CurrentStudent, CurrentTeacher,
    CurrentUser,
};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::api::validation::{normalize_email, validate_email};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{Question, QuestionKind, QuestionMix, UserRole};
use crate::repositories;
use crate::schemas::assessment::{
    AssessmentCreate, AssessmentResponse, AssignStudentsRequest, AssignedAssessmentResponse,
    AttemptStatus, GenerateQuestionsRequest, GeneratedQuestionsResponse,
};
use crate::schemas::submission::SubmissionResponse;
use crate::services::evaluator::{placeholder_questions, GenerateRequest};
use crate::services::session_timing;

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_assessment).get(list_assessments))
        .route("/generate-questions", post(generate_questions))
        .route("/assigned", get(list_assigned))
        .route("/:assessment_id", get(get_assessment).delete(delete_assessment))
        .route("/:assessment_id/students", post(assign_students))
        .route("/:assessment_id/results", get(assessment_results))
}

async fn create_assessment(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<AssessmentCreate>,
) -> Result<(StatusCode, Json<AssessmentResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let bounds = state.settings().assessment();
    if payload.duration_minutes < bounds.min_duration_minutes
        || payload.duration_minutes > bounds.max_duration_minutes
    {
        return Err(ApiError::BadRequest(format!(
            "duration_minutes must be between {} and {}",
            bounds.min_duration_minutes, bounds.max_duration_minutes
        )));
    }

    if payload.questions.is_empty() {
        return Err(ApiError::BadRequest("questions must not be empty".to_string()));
    }
    validate_questions(&payload.questions)?;

    let assigned_emails = normalize_assigned_emails(&payload.assigned_emails)?;
    let question_mix = QuestionMix::of(&payload.questions);

    let now = primitive_now_utc();
    let assessment = repositories::assessments::create(
        state.db(),
        repositories::assessments::CreateAssessment {
            id: &Uuid::new_v4().to_string(),
            title: &payload.title,
            topic: &payload.topic,
            language: &payload.language,
            difficulty: payload.difficulty,
            duration_minutes: payload.duration_minutes,
            questions: &payload.questions,
            question_mix: &question_mix,
            assigned_emails: &assigned_emails,
            created_by: &teacher.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assessment"))?;

    Ok((StatusCode::CREATED, Json(AssessmentResponse::from_db(assessment, true))))
}

async fn list_assessments(
    Query(params): Query<AssessmentListQuery>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<AssessmentResponse>>, ApiError> {
    let items = repositories::assessments::list_by_creator(
        state.db(),
        &teacher.id,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list assessments"))?;

    let total_count = repositories::assessments::count_by_creator(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count assessments"))?;

    let items = items
        .into_iter()
        .map(|assessment| AssessmentResponse::from_db(assessment, true))
        .collect();

    Ok(Json(PaginatedResponse {
        items,
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn generate_questions(
    CurrentTeacher(_teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> Result<Json<GeneratedQuestionsResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mix = &payload.question_mix;
    let batches = [
        (QuestionKind::Programming, mix.programming),
        (QuestionKind::Theory, mix.theory),
        (QuestionKind::Mcq, mix.mcq),
    ];

    if batches.iter().all(|(_, count)| *count == 0) {
        return Err(ApiError::BadRequest(
            "question_mix must request at least one question".to_string(),
        ));
    }

    let mut questions = Vec::new();
    let mut fallback = false;

    for (kind, count) in batches {
        if count == 0 {
            continue;
        }

        let request = GenerateRequest {
            kind,
            topic: payload.topic.clone(),
            language: payload.language.clone(),
            difficulty: payload.difficulty,
            count,
        };

        match state.evaluator().generate_questions(&request).await {
            Ok(generated) => questions.extend(generated),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    kind = kind.as_str(),
                    "Question generation failed; substituting placeholders"
                );
                questions.extend(placeholder_questions(&request));
                fallback = true;
            }
        }
    }

    Ok(Json(GeneratedQuestionsResponse { questions, fallback }))
}

async fn list_assigned(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignedAssessmentResponse>>, ApiError> {
    let assessments = repositories::assessments::list_assigned(state.db(), &student.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assigned assessments"))?;

    let sessions = repositories::sessions::list_by_student(state.db(), &student.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list sessions"))?;

    let mut by_assessment = std::collections::HashMap::new();
    for session in sessions {
        by_assessment.insert(session.assessment_id.clone(), session);
    }

    let items = assessments
        .into_iter()
        .map(|assessment| {
            let session = by_assessment.get(&assessment.id);
            let status = match session {
                None => AttemptStatus::NotStarted,
                Some(session) if session.is_open() => AttemptStatus::InProgress,
                Some(_) => AttemptStatus::Completed,
            };
            let percentage = session
                .filter(|session| !session.is_open())
                .map(|session| session.percentage);

            AssignedAssessmentResponse {
                id: assessment.id,
                title: assessment.title,
                topic: assessment.topic,
                language: assessment.language,
                difficulty: assessment.difficulty,
                duration_minutes: assessment.duration_minutes,
                question_count: assessment.questions.0.len(),
                max_score: session_timing::max_score(&assessment.questions.0),
                status,
                percentage,
                created_at: crate::core::time::format_primitive(assessment.created_at),
            }
        })
        .collect();

    Ok(Json(items))
}

async fn get_assessment(
    Path(assessment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    match user.role {
        UserRole::Teacher => {
            let assessment = fetch_owned_assessment(&state, &user, &assessment_id).await?;
            Ok(Json(AssessmentResponse::from_db(assessment, true)))
        }
        UserRole::Student => {
            let assessment = fetch_assessment_for_student(&state, &user, &assessment_id).await?;
            Ok(Json(AssessmentResponse::from_db(assessment, false)))
        }
    }
}

async fn delete_assessment(
    Path(assessment_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let assessment = fetch_owned_assessment(&state, &teacher, &assessment_id).await?;

    repositories::assessments::soft_delete(state.db(), &assessment.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assessment"))?;

    Ok(Json(json!({ "success": true })))
}

async fn assign_students(
    Path(assessment_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<AssignStudentsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.emails.is_empty() {
        return Err(ApiError::BadRequest("emails must not be empty".to_string()));
    }

    let assessment = fetch_owned_assessment(&state, &teacher, &assessment_id).await?;

    let mut assigned = assessment.assigned_emails.0.clone();
    let mut registered = Vec::new();
    let mut unregistered = Vec::new();

    for email in &payload.emails {
        validate_email(email)?;
        let email = normalize_email(email);

        let exists = repositories::users::exists_by_email(state.db(), &email)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check student account"))?;
        if exists.is_some() {
            registered.push(email.clone());
        } else {
            unregistered.push(email.clone());
        }

        if !assigned.contains(&email) {
            assigned.push(email);
        }
    }

    repositories::assessments::update_assigned_emails(
        state.db(),
        &assessment.id,
        &assigned,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update assigned students"))?;

    Ok(Json(json!({
        "assessment_id": assessment.id,
        "assigned_emails": assigned,
        "registered": registered,
        "unregistered": unregistered,
    })))
}

async fn assessment_results(
    Path(assessment_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let assessment = fetch_owned_assessment(&state, &teacher, &assessment_id).await?;

    let sessions = repositories::sessions::list_by_assessment(state.db(), &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list sessions"))?;

    let submissions = repositories::submissions::list_by_assessment(state.db(), &assessment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    let mut by_student: std::collections::HashMap<String, Vec<SubmissionResponse>> =
        std::collections::HashMap::new();
    for submission in submissions {
        by_student
            .entry(submission.student_email.clone())
            .or_default()
            .push(SubmissionResponse::from_db(submission));
    }

    let results: Vec<serde_json::Value> = sessions
        .into_iter()
        .map(|session| {
            let submissions = by_student.remove(&session.student_email).unwrap_or_default();
            json!({
                "session_id": session.id,
                "student_email": session.student_email,
                "total_score": session.total_score,
                "max_score": session.max_score,
                "percentage": session.percentage,
                "started_at": crate::core::time::format_primitive(session.started_at),
                "completed_at": session.completed_at.map(crate::core::time::format_primitive),
                "time_spent_minutes": session.time_spent_minutes,
                "submissions": submissions,
            })
        })
        .collect();

    Ok(Json(json!({
        "assessment_id": assessment.id,
        "title": assessment.title,
        "max_score": session_timing::max_score(&assessment.questions.0),
        "results": results,
    })))
}

fn validate_questions(questions: &[Question]) -> Result<(), ApiError> {
    for (index, question) in questions.iter().enumerate() {
        if question.points() <= 0 {
            return Err(ApiError::BadRequest(format!(
                "question {index}: points must be positive"
            )));
        }
        if question.description().trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "question {index}: description must not be empty"
            )));
        }
        if let Question::Mcq { options, correct_option, .. } = question {
            if options.len() < 2 {
                return Err(ApiError::BadRequest(format!(
                    "question {index}: mcq questions need at least two options"
                )));
            }
            if *correct_option >= options.len() {
                return Err(ApiError::BadRequest(format!(
                    "question {index}: correct_option is out of range"
                )));
            }
        }
    }
    Ok(())
}

fn normalize_assigned_emails(emails: &[String]) -> Result<Vec<String>, ApiError> {
    let mut normalized = Vec::new();
    for email in emails {
        validate_email(email)?;
        let email = normalize_email(email);
        if !normalized.contains(&email) {
            normalized.push(email);
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests;
