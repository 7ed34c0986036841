use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{fetch_assessment_for_student, CurrentStudent};
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Assessment, AssessmentSession};
use crate::repositories;
use crate::schemas::session::{CompleteAssessmentRequest, SessionResponse, StartAssessmentResponse};
use crate::schemas::submission::{
    RunCodeRequest, RunCodeResponse, SubmitAnswerRequest, SubmitAnswerResponse, SubmissionResponse,
};
use crate::services::evaluator::RunRequest;
use crate::services::session_timing;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:assessment_id/start", post(start_assessment))
        .route("/:assessment_id/session", get(get_session))
        .route("/:assessment_id/questions/:question_index/submit", post(submit_answer))
        .route("/:assessment_id/run-code", post(run_code))
        .route("/:assessment_id/complete", post(complete_assessment))
}

/// Idempotent start: re-invoking never resets the clock; the caller only
/// learns whether the session was resumed.
async fn start_assessment(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StartAssessmentResponse>, ApiError> {
    let assessment = fetch_assessment_for_student(&state, &student, &assessment_id).await?;

    if let Some(existing) =
        find_session(&state, &assessment.id, &student.email).await?
    {
        return Ok(Json(start_response(&assessment, existing, true)));
    }

    let now = primitive_now_utc();
    let max_score = session_timing::max_score(&assessment.questions.0);
    let session_id = Uuid::new_v4().to_string();

    let inserted = repositories::sessions::create(
        state.db(),
        repositories::sessions::CreateSession {
            id: &session_id,
            assessment_id: &assessment.id,
            student_email: &student.email,
            max_score,
            started_at: now,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create session"))?;

    // A lost insert race means a concurrent start already created the
    // session; both callers converge on the same row.
    let session =
        repositories::sessions::fetch_one_by_pair(state.db(), &assessment.id, &student.email)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?;

    Ok(Json(start_response(&assessment, session, !inserted)))
}

async fn get_session(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let assessment = fetch_assessment_for_student(&state, &student, &assessment_id).await?;

    let session = find_session(&state, &assessment.id, &student.email)
        .await?
        .ok_or_else(|| ApiError::Conflict("Assessment has not been started".to_string()))?;

    let submissions =
        repositories::submissions::list_for_student(state.db(), &assessment.id, &student.email)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    let remaining = if session.is_open() {
        session_timing::remaining_seconds(
            session.started_at,
            assessment.duration_minutes,
            primitive_now_utc(),
        )
    } else {
        0
    };

    Ok(Json(json!({
        "session": SessionResponse::from_db(session),
        "time_remaining_seconds": remaining,
        "submissions": submissions
            .into_iter()
            .map(SubmissionResponse::from_db)
            .collect::<Vec<_>>(),
    })))
}

async fn submit_answer(
    Path((assessment_id, question_index)): Path<(String, usize)>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assessment = fetch_assessment_for_student(&state, &student, &assessment_id).await?;

    let session = find_session(&state, &assessment.id, &student.email)
        .await?
        .ok_or_else(|| ApiError::Conflict("Assessment has not been started".to_string()))?;

    if !session.is_open() {
        return Err(ApiError::Conflict("Assessment has already been completed".to_string()));
    }

    let now = primitive_now_utc();
    if session_timing::has_expired(session.started_at, assessment.duration_minutes, now) {
        // Lazy expiry: the first write after the deadline completes the
        // session and is itself rejected; later attempts find it completed.
        let time_spent = session_timing::elapsed_minutes(session.started_at, now);
        repositories::sessions::complete_if_open(state.db(), &session.id, now, time_spent)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to complete expired session"))?;
        return Err(ApiError::Conflict(
            "Time limit exceeded; the session has been completed".to_string(),
        ));
    }

    let Some(question) = assessment.questions.0.get(question_index) else {
        return Err(ApiError::BadRequest(format!(
            "question index {question_index} is out of range"
        )));
    };

    let language = payload.language.as_deref().or(Some(assessment.language.as_str()));
    let submission = repositories::submissions::upsert(
        state.db(),
        repositories::submissions::UpsertSubmission {
            id: &Uuid::new_v4().to_string(),
            assessment_id: &assessment.id,
            question_index: question_index as i32,
            student_email: &student.email,
            answer: &payload.answer,
            language,
            submitted_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store submission"))?;

    match state.evaluator().evaluate(question, &payload.answer).await {
        Ok(outcome) => {
            let evaluated_at = primitive_now_utc();
            repositories::submissions::record_evaluation(
                state.db(),
                &submission.id,
                repositories::submissions::RecordEvaluation {
                    status: outcome.status,
                    score: outcome.score,
                    feedback: Some(outcome.feedback.clone()),
                    execution_time_ms: outcome.execution_time_ms,
                    memory_used_kb: outcome.memory_used_kb,
                    evaluated_at,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to record evaluation"))?;

            let total_score =
                repositories::submissions::sum_scores(state.db(), &assessment.id, &student.email)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to sum scores"))?;
            let percentage = session_timing::percentage(total_score, session.max_score);

            repositories::sessions::update_score(
                state.db(),
                &session.id,
                total_score,
                percentage,
                evaluated_at,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update session score"))?;

            Ok(Json(SubmitAnswerResponse {
                submission_id: submission.id,
                question_index: question_index as i32,
                status: outcome.status,
                score: outcome.score,
                max_score: outcome.max_score,
                feedback: Some(outcome.feedback),
                evaluated: true,
                session_total_score: total_score,
                session_percentage: percentage,
                message: "Answer evaluated".to_string(),
            }))
        }
        Err(err) => {
            // Degraded mode: the answer is kept pending and totals are
            // untouched; resubmission is the recovery path.
            tracing::warn!(
                error = %err,
                submission_id = %submission.id,
                "Evaluation failed; submission left pending"
            );

            Ok(Json(SubmitAnswerResponse {
                submission_id: submission.id,
                question_index: question_index as i32,
                status: submission.status,
                score: 0.0,
                max_score: question.points() as f64,
                feedback: None,
                evaluated: false,
                session_total_score: session.total_score,
                session_percentage: session.percentage,
                message: "Answer saved but not yet evaluated".to_string(),
            }))
        }
    }
}

/// Scratch execution for the student workspace; never touches scores.
async fn run_code(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<RunCodeRequest>,
) -> Result<Json<RunCodeResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assessment = fetch_assessment_for_student(&state, &student, &assessment_id).await?;

    let request = RunRequest {
        language: payload.language.unwrap_or_else(|| assessment.language.clone()),
        code: payload.code,
        stdin: payload.stdin,
    };

    let outcome = state.evaluator().run_code(&request).await.map_err(|err| {
        tracing::warn!(error = %err, "Code execution failed");
        ApiError::ServiceUnavailable("Code execution is temporarily unavailable".to_string())
    })?;

    Ok(Json(RunCodeResponse {
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        status: outcome.status,
        execution_time_ms: outcome.execution_time_ms,
    }))
}

async fn complete_assessment(
    Path(assessment_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    payload: Option<Json<CompleteAssessmentRequest>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let assessment = fetch_assessment_for_student(&state, &student, &assessment_id).await?;

    let session = find_session(&state, &assessment.id, &student.email)
        .await?
        .ok_or_else(|| ApiError::Conflict("Assessment has not been started".to_string()))?;

    if !session.is_open() {
        return Err(ApiError::Conflict("Assessment has already been completed".to_string()));
    }

    let auto_submitted = payload.map(|Json(body)| body.auto_submitted).unwrap_or(false);

    let now = primitive_now_utc();
    let time_spent = session_timing::elapsed_minutes(session.started_at, now);
    repositories::sessions::complete_if_open(state.db(), &session.id, now, time_spent)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to complete session"))?;

    tracing::info!(
        session_id = %session.id,
        student_email = %student.email,
        auto_submitted,
        "Session completed"
    );

    let session = repositories::sessions::fetch_one_by_pair(
        state.db(),
        &assessment.id,
        &student.email,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch session"))?;

    Ok(Json(SessionResponse::from_db(session)))
}

fn start_response(
    assessment: &Assessment,
    session: AssessmentSession,
    resumed: bool,
) -> StartAssessmentResponse {
    StartAssessmentResponse {
        session_id: session.id,
        assessment_id: session.assessment_id,
        started_at: format_primitive(session.started_at),
        duration_minutes: assessment.duration_minutes,
        max_score: session.max_score,
        resumed,
    }
}

async fn find_session(
    state: &AppState,
    assessment_id: &str,
    student_email: &str,
) -> Result<Option<AssessmentSession>, ApiError> {
    repositories::sessions::find_by_pair(state.db(), assessment_id, student_email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch session"))
}
