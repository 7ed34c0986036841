use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn teacher_lists_student_roster() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    test_support::insert_student(ctx.state.db(), "a@example.com", "student-pass").await;
    test_support::insert_student(ctx.state.db(), "b@example.com", "student-pass").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/students", Some(&token), None))
        .await
        .expect("list students");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["total_count"], 2);
    // The teacher account itself is not part of the roster.
    for item in body["items"].as_array().unwrap() {
        assert_eq!(item["role"], "student");
    }
}

#[tokio::test]
async fn students_cannot_list_the_roster() {
    let ctx = test_support::setup_test_context().await;
    let student =
        test_support::insert_student(ctx.state.db(), "a@example.com", "student-pass").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/students", Some(&token), None))
        .await
        .expect("list students");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_stats_aggregate_own_sessions() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db()).await;
    let student =
        test_support::insert_student(ctx.state.db(), "a@example.com", "student-pass").await;
    let first =
        test_support::insert_assessment(ctx.state.db(), &teacher.id, 60, &["a@example.com"]).await;
    test_support::insert_assessment(ctx.state.db(), &teacher.id, 60, &["a@example.com"]).await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/assessments/{}/start", first.id),
            Some(&token),
            None,
        ))
        .await
        .expect("start");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/assessments/{}/questions/1/submit", first.id),
            Some(&token),
            Some(json!({ "answer": "1" })),
        ))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/assessments/{}/complete", first.id),
            Some(&token),
            None,
        ))
        .await
        .expect("complete");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/me/stats",
            Some(&token),
            None,
        ))
        .await
        .expect("stats");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["assigned"], 2);
    assert_eq!(body["started"], 1);
    assert_eq!(body["completed"], 1);
    assert_eq!(body["in_progress"], 0);
    // 20 of 30 points → 67%.
    assert_eq!(body["average_percentage"], 67);
    assert_eq!(body["total_score"], 20.0);
}
