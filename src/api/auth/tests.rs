use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn student_can_register_and_login() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "Student@Example.com",
                "password": "student-pass",
                "full_name": "Student One"
            })),
        ))
        .await
        .expect("register");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["user"]["email"], "student@example.com");
    assert_eq!(created["user"]["role"], "student");
    assert!(created["access_token"].as_str().is_some());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "student@example.com", "password": "student-pass" })),
        ))
        .await
        .expect("login");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let token = body["access_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");

    let status = response.status();
    let me = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {me}");
    assert_eq!(me["email"], "student@example.com");
}

#[tokio::test]
async fn register_rejects_short_password() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "short@example.com", "password": "short" })),
        ))
        .await
        .expect("register");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["detail"].as_str().unwrap_or("").contains("Password must be at least"));
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_student(ctx.state.db(), "taken@example.com", "student-pass").await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "taken@example.com", "password": "student-pass" })),
        ))
        .await
        .expect("register");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn teacher_email_cannot_be_registered() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": test_support::TEST_TEACHER_EMAIL,
                "password": "whatever-pass"
            })),
        ))
        .await
        .expect("register");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn teacher_login_lazily_creates_singleton_account() {
    let ctx = test_support::setup_test_context().await;

    let login = json!({
        "email": test_support::TEST_TEACHER_EMAIL,
        "password": test_support::TEST_TEACHER_PASSWORD
    });

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(login.clone()),
        ))
        .await
        .expect("first login");

    let status = response.status();
    let first = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {first}");
    assert_eq!(first["user"]["role"], "teacher");
    let first_id = first["user"]["id"].as_str().expect("id").to_string();

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::POST, "/api/v1/auth/login", None, Some(login)))
        .await
        .expect("second login");

    let second = test_support::read_json(response).await;
    assert_eq!(second["user"]["id"], first_id.as_str());
}

#[tokio::test]
async fn teacher_login_rejects_wrong_configured_password() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": test_support::TEST_TEACHER_EMAIL,
                "password": "not-the-configured-pass"
            })),
        ))
        .await
        .expect("login");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_student(ctx.state.db(), "known@example.com", "student-pass").await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "known@example.com", "password": "wrong-pass" })),
        ))
        .await
        .expect("login");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
