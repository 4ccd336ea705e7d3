//! Shared harness: in-process router with in-memory collaborators, driven
//! through `tower::ServiceExt::oneshot`.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use portal_auth::config::{AuthConfig, Environment, JwtConfig};
use portal_auth::services::{EmailProvider, MockEmailService};
use portal_auth::store::{AuthStore, InMemoryStore, LockoutPolicy};
use portal_auth::{build_router, AppState};
use portal_core::middleware::rate_limit::{CounterStore, InMemoryCounterStore, RateLimitConfig};

pub const TEST_IP: &str = "203.0.113.10";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        environment: Environment::Development,
        service_name: "portal-auth-test".into(),
        log_level: "warn".into(),
        port: 0,
        base_url: "http://localhost:3000".into(),
        allowed_origins: vec!["http://localhost:3000".into()],
        jwt: JwtConfig {
            secret: "integration-test-jwt-secret".into(),
            csrf_secret: "integration-test-csrf-secret".into(),
            access_token_expiry_hours: 24,
            refresh_token_expiry_days: 7,
        },
        lockout: LockoutPolicy {
            max_failed_attempts: 5,
            lockout_duration_minutes: 30,
        },
        // High ceilings so unrelated tests never trip the limiter.
        rate_limit: RateLimitConfig {
            window_seconds: 60,
            ip_max: 10_000,
            user_max: 10_000,
            super_admin_user_max: 10_000,
            org_max: 10_000,
        },
        rate_limit_eviction_seconds: 60,
        smtp: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub email: Arc<MockEmailService>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let email = Arc::new(MockEmailService::new());
        let state = AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn AuthStore>,
            Arc::clone(&email) as Arc<dyn EmailProvider>,
            Arc::new(InMemoryCounterStore::new()) as Arc<dyn CounterStore>,
        );
        Self {
            router: build_router(state),
            store,
            email,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session: Option<&TestSession>,
    ) -> (StatusCode, Value) {
        self.request_from_ip(method, uri, body, session, TEST_IP)
            .await
    }

    pub async fn request_from_ip(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session: Option<&TestSession>,
        ip: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", ip);

        if let Some(session) = session {
            builder = builder
                .header(header::COOKIE, session.cookie_header())
                .header("x-csrf-token", session.csrf_token.clone());
        }

        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Register an organization with an owner and return the live session.
    pub async fn register(&self, org: &str, slug: &str, email: &str, password: &str) -> TestSession {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "organizationName": org,
                    "slug": slug,
                    "email": email,
                    "password": password,
                    "firstName": "Test",
                    "lastName": "Owner",
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        TestSession::from_body(&body)
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": email, "password": password })),
            None,
        )
        .await
    }

    /// Let the spawned email tasks run, then return everything sent so far.
    pub async fn sent_emails(&self) -> Vec<portal_auth::services::email::SentEmail> {
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        self.email.sent()
    }

    /// Extract the token from the most recent emailed link of the given kind.
    pub async fn emailed_token(&self, kind: portal_auth::services::email::EmailKind) -> String {
        let sent = self.sent_emails().await;
        let email = sent
            .iter()
            .rev()
            .find(|e| e.kind == kind)
            .unwrap_or_else(|| panic!("no {kind:?} email sent"));
        email
            .detail
            .rsplit(['/', '='])
            .next()
            .expect("token in link")
            .to_string()
    }
}

/// Client-side view of one authenticated session.
pub struct TestSession {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
    pub body: Value,
}

impl TestSession {
    pub fn from_body(body: &Value) -> Self {
        Self {
            access_token: body["accessToken"].as_str().expect("accessToken").into(),
            refresh_token: body["refreshToken"].as_str().expect("refreshToken").into(),
            csrf_token: body["csrfToken"].as_str().expect("csrfToken").into(),
            body: body.clone(),
        }
    }

    pub fn cookie_header(&self) -> String {
        format!(
            "access_token={}; refresh_token={}; csrf_token={}",
            self.access_token, self.refresh_token, self.csrf_token
        )
    }

    pub fn organization_id(&self) -> String {
        self.body["organization"]["id"]
            .as_str()
            .expect("organization id")
            .to_string()
    }

    pub fn user_id(&self) -> String {
        self.body["user"]["id"].as_str().expect("user id").to_string()
    }
}
