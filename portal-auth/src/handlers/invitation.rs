use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;
use validator::Validate;

use portal_core::error::{AppError, ErrorCode};

use crate::dtos::invitation::{
    AcceptInvitationRequest, CreateInvitationRequest, InvitationPreviewResponse,
    InvitationResponse, ReactivatedMemberResponse,
};
use crate::middleware::{AuthContext, CurrentUser};
use crate::rbac::Role;
use crate::services::InvitationOutcome;
use crate::AppState;

use super::{client_ip, with_session_cookies};

/// The path organization must match the session's tenant context;
/// super-admins may act on any organization.
fn scoped_role(ctx: &AuthContext, organization_id: Uuid) -> Result<Role, AppError> {
    if ctx.user.is_super_admin {
        return Ok(Role::SuperAdmin);
    }
    match (&ctx.organization, ctx.effective_role()) {
        (Some(org), Some(role)) if org.id == organization_id => Ok(role),
        _ => Err(AppError::Forbidden(
            ErrorCode::NotOrgMember,
            "Not an active member of this organization".to_string(),
        )),
    }
}

pub async fn create_invitation(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(organization_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<Response, AppError> {
    req.validate()?;
    let role = scoped_role(&ctx, organization_id)?;

    let outcome = state
        .invitations
        .create(organization_id, &ctx.user, role, req, client_ip(&headers))
        .await?;

    match outcome {
        InvitationOutcome::Invited(invitation) => Ok((
            StatusCode::CREATED,
            Json(InvitationResponse::from(&invitation)),
        )
            .into_response()),
        InvitationOutcome::Reactivated(member) => Ok(Json(ReactivatedMemberResponse {
            reactivated: true,
            member_id: member.id,
            user_id: member.user_id,
            role: member.role,
        })
        .into_response()),
    }
}

pub async fn list_invitations(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<Vec<InvitationResponse>>, AppError> {
    scoped_role(&ctx, organization_id)?;
    let invitations = state.invitations.list(organization_id).await?;
    Ok(Json(invitations.iter().map(Into::into).collect()))
}

pub async fn cancel_invitation(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path((organization_id, invitation_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<InvitationResponse>, AppError> {
    let role = scoped_role(&ctx, organization_id)?;
    let invitation = state
        .invitations
        .cancel(
            organization_id,
            invitation_id,
            &ctx.user,
            role,
            client_ip(&headers),
        )
        .await?;
    Ok(Json(InvitationResponse::from(&invitation)))
}

/// Public: renders the acceptance prompt for an emailed invitation link.
pub async fn preview_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationPreviewResponse>, AppError> {
    let preview = state.invitations.preview(&token).await?;
    Ok(Json(preview.into()))
}

/// Public: accepting signs the user in, so the session cookies are set on
/// the way out.
pub async fn accept_invitation(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Option<Json<AcceptInvitationRequest>>,
) -> Result<Response, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session = state
        .invitations
        .accept(&token, req, client_ip(&headers))
        .await?;

    let jar = with_session_cookies(
        jar,
        &session,
        state.tokens.refresh_token_expiry_seconds(),
        state.config.environment,
    );
    Ok((
        jar,
        Json(crate::dtos::auth::SessionResponse::from(session)),
    )
        .into_response())
}
