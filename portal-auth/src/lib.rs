//! portal-auth: authentication, sessions, tenant RBAC, invitations, and
//! abuse limiting for the organization portal.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rbac;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use portal_core::middleware::rate_limit::{
    ip_rate_limit_middleware, principal_rate_limit_middleware, CounterStore, RateLimiter,
};
use portal_core::middleware::security_headers::security_headers_middleware;
use portal_core::middleware::tracing::request_id_middleware;

use crate::config::AuthConfig;
use crate::middleware::auth::{auth_middleware, AuthContext};
use crate::middleware::guards;
use crate::rbac::Permission;
use crate::services::{
    AuditService, AuthService, EmailProvider, InvitationService, TokenService,
};
use crate::store::AuthStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub store: Arc<dyn AuthStore>,
    pub tokens: TokenService,
    pub auth: AuthService,
    pub invitations: InvitationService,
    pub audit: AuditService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the service graph. The store, email provider, and rate-limit
    /// counter store are injected so deployments (and tests) can swap
    /// implementations without touching the services.
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn AuthStore>,
        email: Arc<dyn EmailProvider>,
        counters: Arc<dyn CounterStore>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt);
        let audit = AuditService::new(Arc::clone(&store));
        let auth = AuthService::new(
            Arc::clone(&store),
            tokens.clone(),
            Arc::clone(&email),
            audit.clone(),
            config.lockout.clone(),
            config.base_url.clone(),
        );
        let invitations = InvitationService::new(
            Arc::clone(&store),
            tokens.clone(),
            email,
            audit.clone(),
            config.base_url.clone(),
        );
        let rate_limiter = Arc::new(RateLimiter::new(counters, config.rate_limit.clone()));

        Self {
            config,
            store,
            tokens,
            auth,
            invitations,
            audit,
            rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Unauthenticated surface; every route is behind the per-IP window.
    let public = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/verify-email", get(handlers::auth::verify_email))
        .route(
            "/auth/password-reset",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        )
        .route(
            "/invitations/:token",
            get(handlers::invitation::preview_invitation),
        )
        .route(
            "/invitations/:token/accept",
            post(handlers::invitation::accept_invitation),
        )
        .route_layer(from_fn_with_state(
            Arc::clone(&state.rate_limiter),
            ip_rate_limit_middleware,
        ));

    let invitation_admin = Router::new()
        .route(
            "/organizations/:organization_id/invitations",
            post(handlers::invitation::create_invitation)
                .get(handlers::invitation::list_invitations),
        )
        .route(
            "/organizations/:organization_id/invitations/:invitation_id",
            delete(handlers::invitation::cancel_invitation),
        )
        .route_layer(from_fn(guards::require_permission(
            Permission::MemberInvite,
        )));

    // Authenticated surface: auth context first, then per-principal windows.
    let protected = Router::new()
        .route(
            "/auth/select-organization",
            post(handlers::auth::select_organization),
        )
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/auth/change-password",
            post(handlers::auth::change_password),
        )
        .merge(invitation_admin)
        .route_layer(from_fn_with_state(
            Arc::clone(&state.rate_limiter),
            principal_rate_limit_middleware::<AuthContext>,
        ))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok()),
        ))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public.merge(protected))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "portal-auth" }))
}
