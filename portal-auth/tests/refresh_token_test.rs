mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, TestSession};

#[tokio::test]
async fn refresh_rotates_the_token_and_invalidates_the_old_one() {
    let app = TestApp::new();
    let session = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, body) = app
        .request(Method::POST, "/api/auth/refresh", None, Some(&session))
        .await;
    assert_eq!(status, StatusCode::OK);
    let renewed = TestSession::from_body(&body);
    assert_ne!(renewed.refresh_token, session.refresh_token);
    // Tenant context survives the refresh.
    assert_eq!(body["organization"]["slug"], "acme");
    assert_eq!(body["role"], "owner");

    // The superseded token is single-use.
    let (status, body) = app
        .request(Method::POST, "/api/auth/refresh", None, Some(&session))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn refresh_accepts_body_fallback() {
    let app = TestApp::new();
    let session = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/refresh",
            Some(json!({ "refreshToken": session.refresh_token })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn refresh_without_a_token_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .request(Method::POST, "/api/auth/refresh", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn refresh_with_an_unknown_token_is_rejected() {
    let app = TestApp::new();
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/refresh",
            Some(json!({ "refreshToken": "f".repeat(64) })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_refresh_token() {
    let app = TestApp::new();
    let session = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, _) = app
        .request(Method::POST, "/api/auth/logout", None, Some(&session))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/refresh",
            Some(json!({ "refreshToken": session.refresh_token })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
