use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use portal_core::error::AppError;

use crate::dtos::auth::{
    ChangePasswordRequest, LoginRequest, MeResponse, MessageResponse,
    OrganizationSelectionResponse, PasswordResetConfirmRequest, PasswordResetRequest,
    RefreshRequest, RegisterRequest, RegisterResponse, SelectOrganizationRequest,
    SessionResponse, VerifyEmailQuery,
};
use crate::middleware::CurrentUser;
use crate::services::token::REFRESH_TOKEN_COOKIE;
use crate::services::LoginOutcome;
use crate::AppState;

use super::{clear_session_cookies, client_ip, with_session_cookies};

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    let session = state.auth.register(req, client_ip(&headers)).await?;

    let jar = with_session_cookies(
        jar,
        &session,
        state.tokens.refresh_token_expiry_seconds(),
        state.config.environment,
    );
    let body = RegisterResponse {
        session: session.into(),
        requires_email_verification: true,
    };
    Ok((StatusCode::CREATED, jar, Json(body)).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    match state.auth.login(req, client_ip(&headers)).await? {
        LoginOutcome::Session(session) => {
            let jar = with_session_cookies(
                jar,
                &session,
                state.tokens.refresh_token_expiry_seconds(),
                state.config.environment,
            );
            Ok((jar, Json(SessionResponse::from(*session))).into_response())
        }
        LoginOutcome::SelectOrganization {
            session,
            organizations,
        } => {
            let jar = with_session_cookies(
                jar,
                &session,
                state.tokens.refresh_token_expiry_seconds(),
                state.config.environment,
            );
            let body = OrganizationSelectionResponse {
                requires_organization_selection: true,
                organizations,
                session: SessionResponse::from(*session),
            };
            Ok((jar, Json(body)).into_response())
        }
    }
}

pub async fn select_organization(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<SelectOrganizationRequest>,
) -> Result<Response, AppError> {
    let session = state
        .auth
        .select_organization(ctx.user.id, req.organization_id, client_ip(&headers))
        .await?;

    let jar = with_session_cookies(
        jar,
        &session,
        state.tokens.refresh_token_expiry_seconds(),
        state.config.environment,
    );
    Ok((jar, Json(SessionResponse::from(session))).into_response())
}

/// Public: the access token may already be expired when this is called.
/// Authentication is the refresh token itself.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, AppError> {
    let from_cookie = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string());
    let from_body = body.and_then(|Json(req)| req.refresh_token);
    let token = from_cookie.or(from_body).ok_or_else(|| {
        AppError::Unauthorized(
            portal_core::error::ErrorCode::InvalidToken,
            "Missing refresh token".to_string(),
        )
    })?;

    let session = state.auth.refresh(&token).await?;

    let jar = with_session_cookies(
        jar,
        &session,
        state.tokens.refresh_token_expiry_seconds(),
        state.config.environment,
    );
    Ok((jar, Json(SessionResponse::from(session))).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    state.auth.logout(ctx.user.id, client_ip(&headers)).await?;
    let jar = clear_session_cookies(jar);
    Ok((jar, Json(MessageResponse::new("Logged out"))).into_response())
}

pub async fn me(CurrentUser(ctx): CurrentUser) -> Json<MeResponse> {
    let permissions = ctx.effective_role().map(|_| ctx.permissions());
    Json(MeResponse {
        user: ctx.user.sanitized(),
        organization: ctx.organization.as_ref().map(Into::into),
        role: ctx.effective_role(),
        permissions,
    })
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.verify_email(&query.token).await?;
    Ok(Json(MessageResponse::new("Email verified")))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;
    state
        .auth
        .request_password_reset(&req.email, client_ip(&headers))
        .await?;
    // Identical response whether or not the address exists.
    Ok(Json(MessageResponse::new(
        "If that email is registered, a reset link has been sent",
    )))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .auth
        .confirm_password_reset(&req.token, req.new_password, client_ip(&headers))
        .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .auth
        .change_password(
            ctx.user.id,
            req.current_password,
            req.new_password,
            client_ip(&headers),
        )
        .await?;
    Ok(Json(MessageResponse::new("Password changed")))
}
