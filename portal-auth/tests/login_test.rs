mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use portal_auth::store::AuthStore;

use common::TestApp;

#[tokio::test]
async fn login_returns_session_with_tenant_context() {
    let app = TestApp::new();
    app.register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, body) = app.login("alice@acme.test", "Str0ngPass1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization"]["slug"], "acme");
    assert_eq!(body["role"], "owner");
    assert!(body["accessToken"].as_str().is_some());
    assert!(body["csrfToken"].as_str().is_some());
}

#[tokio::test]
async fn unknown_email_and_wrong_password_both_return_401() {
    let app = TestApp::new();
    app.register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, body) = app.login("nobody@acme.test", "Str0ngPass1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let (status, body) = app.login("alice@acme.test", "WrongPass99").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn fifth_failure_locks_and_correct_password_is_rejected() {
    let app = TestApp::new();
    app.register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    for attempt in 1..=5 {
        let (status, _) = app.login("alice@acme.test", "WrongPass99").await;
        if attempt < 5 {
            assert_eq!(status, StatusCode::UNAUTHORIZED, "attempt {attempt}");
        } else {
            assert_eq!(status, StatusCode::LOCKED, "attempt {attempt}");
        }
    }

    // The password being correct makes no difference while locked.
    let (status, body) = app.login("alice@acme.test", "Str0ngPass1").await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["code"], "ACCOUNT_LOCKED");
}

#[tokio::test]
async fn lapsed_lockout_allows_login_and_clears_the_counter() {
    let app = TestApp::new();
    app.register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    for _ in 0..5 {
        app.login("alice@acme.test", "WrongPass99").await;
    }

    // Wind the lock back so the window has already elapsed.
    let mut user = app
        .store
        .find_user_by_email("alice@acme.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.failed_login_attempts, 5);
    user.locked_until = Some(Utc::now() - Duration::minutes(1));
    app.store.update_user(&user).await.unwrap();

    let (status, body) = app.login("alice@acme.test", "Str0ngPass1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["accessToken"].as_str().is_some());

    let user = app
        .store
        .find_user_by_email("alice@acme.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    let app = TestApp::new();
    app.register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, _) = app.login("Alice@ACME.test", "Str0ngPass1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_email_is_validated() {
    let app = TestApp::new();
    let (status, _) = app.login("not-an-email", "Str0ngPass1").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn weak_password_rejected_at_registration() {
    let app = TestApp::new();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "organizationName": "Acme Trust",
                "slug": "acme",
                "email": "alice@acme.test",
                "password": "short",
                "firstName": "Alice",
                "lastName": "Smith",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "WEAK_PASSWORD");
}

#[tokio::test]
async fn duplicate_slug_and_email_conflict() {
    let app = TestApp::new();
    app.register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "organizationName": "Other",
                "slug": "acme",
                "email": "other@acme.test",
                "password": "Str0ngPass1",
                "firstName": "O",
                "lastName": "T",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SLUG_EXISTS");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "organizationName": "Other",
                "slug": "other",
                "email": "alice@acme.test",
                "password": "Str0ngPass1",
                "firstName": "O",
                "lastName": "T",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_EXISTS");
}
