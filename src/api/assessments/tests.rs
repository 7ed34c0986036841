use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

fn sample_create_payload() -> serde_json::Value {
    json!({
        "title": "Rust basics",
        "topic": "Ownership",
        "language": "rust",
        "difficulty": "beginner",
        "duration_minutes": 60,
        "questions": [
            {
                "type": "programming",
                "description": "Write a function that sums a slice",
                "test_cases": [
                    {"input": "1 2 3", "expected_output": "6", "hidden": false},
                    {"input": "10 -4", "expected_output": "6", "hidden": true}
                ],
                "points": 10
            },
            {
                "type": "mcq",
                "description": "Which trait enables cloning?",
                "options": ["Copy", "Clone", "Send", "Sync"],
                "correct_option": 1,
                "explanation": "Clone provides an explicit deep copy.",
                "points": 20
            }
        ],
        "assigned_emails": ["Student@Example.com"]
    })
}

#[tokio::test]
async fn teacher_can_create_and_list_assessments() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments",
            Some(&token),
            Some(sample_create_payload()),
        ))
        .await
        .expect("create assessment");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["max_score"], 30.0);
    assert_eq!(created["question_count"], 2);
    assert_eq!(created["question_mix"]["programming"], 1);
    assert_eq!(created["question_mix"]["mcq"], 1);
    assert_eq!(created["assigned_emails"][0], "student@example.com");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/assessments",
            Some(&token),
            None,
        ))
        .await
        .expect("list assessments");

    let status = response.status();
    let listed = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {listed}");
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["title"], "Rust basics");
}

#[tokio::test]
async fn create_rejects_out_of_bounds_duration() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let mut payload = sample_create_payload();
    payload["duration_minutes"] = json!(5);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments",
            Some(&token),
            Some(payload),
        ))
        .await
        .expect("create assessment");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["detail"].as_str().unwrap_or("").contains("duration_minutes"));
}

#[tokio::test]
async fn create_rejects_empty_questions_and_bad_mcq() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let mut payload = sample_create_payload();
    payload["questions"] = json!([]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments",
            Some(&token),
            Some(payload),
        ))
        .await
        .expect("create assessment");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut payload = sample_create_payload();
    payload["questions"][1]["correct_option"] = json!(9);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments",
            Some(&token),
            Some(payload),
        ))
        .await
        .expect("create assessment");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn student_role_cannot_create_assessments() {
    let ctx = test_support::setup_test_context().await;
    let student =
        test_support::insert_student(ctx.state.db(), "student@example.com", "student-pass").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments",
            Some(&token),
            Some(sample_create_payload()),
        ))
        .await
        .expect("create assessment");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_detail_view_strips_answer_material() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let student =
        test_support::insert_student(ctx.state.db(), "student@example.com", "student-pass").await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), &teacher.id, 60, &["student@example.com"])
            .await;

    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assessments/{}", assessment.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("teacher detail");

    let teacher_view = test_support::read_json(response).await;
    assert_eq!(teacher_view["questions"][0]["test_cases"].as_array().unwrap().len(), 2);
    assert_eq!(teacher_view["questions"][1]["correct_option"], 1);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assessments/{}", assessment.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("student detail");

    let student_view = test_support::read_json(response).await;
    assert_eq!(student_view["questions"][0]["test_cases"].as_array().unwrap().len(), 1);
    assert!(student_view["questions"][1].get("correct_option").is_none());
    assert!(student_view["questions"][1].get("explanation").is_none());
}

#[tokio::test]
async fn unassigned_and_unknown_assessments_fail_the_same_way() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let student =
        test_support::insert_student(ctx.state.db(), "outsider@example.com", "student-pass").await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), &teacher.id, 60, &["someone@else.com"])
            .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assessments/{}", assessment.id),
            Some(&token),
            None,
        ))
        .await
        .expect("unassigned detail");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/assessments/no-such-assessment",
            Some(&token),
            None,
        ))
        .await
        .expect("unknown detail");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn soft_delete_hides_assessment_from_listings() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let student =
        test_support::insert_student(ctx.state.db(), "student@example.com", "student-pass").await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), &teacher.id, 60, &["student@example.com"])
            .await;

    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/assessments/{}", assessment.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("delete assessment");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/assessments",
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("list assessments");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 0);

    // Soft-deleted assessments look missing to students.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assessments/{}", assessment.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("student detail");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn generate_questions_uses_the_evaluator() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/generate-questions",
            Some(&token),
            Some(json!({
                "topic": "Sorting",
                "language": "python",
                "difficulty": "beginner",
                "question_mix": {"programming": 1, "mcq": 2}
            })),
        ))
        .await
        .expect("generate questions");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["fallback"], false);
    assert_eq!(body["questions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn generate_questions_falls_back_to_placeholders() {
    let ctx = test_support::setup_test_context_with_evaluator(Arc::new(
        test_support::FailingEvaluator,
    ))
    .await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assessments/generate-questions",
            Some(&token),
            Some(json!({
                "topic": "Sorting",
                "language": "python",
                "question_mix": {"theory": 2}
            })),
        ))
        .await
        .expect("generate questions");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["fallback"], true);
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn assign_students_reports_roster_state() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    test_support::insert_student(ctx.state.db(), "known@example.com", "student-pass").await;
    let assessment =
        test_support::insert_assessment(ctx.state.db(), &teacher.id, 60, &["first@example.com"])
            .await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/assessments/{}/students", assessment.id),
            Some(&token),
            Some(json!({ "emails": ["Known@Example.com", "new@example.com"] })),
        ))
        .await
        .expect("assign students");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["registered"][0], "known@example.com");
    assert_eq!(body["unregistered"][0], "new@example.com");
    let assigned = body["assigned_emails"].as_array().unwrap();
    assert_eq!(assigned.len(), 3);
}
