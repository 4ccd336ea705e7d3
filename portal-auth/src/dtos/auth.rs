use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{OrganizationSummary, SanitizedUser};
use crate::rbac::Role;
use crate::services::Session;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200))]
    pub organization_name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    /// Optional tenant preselection for multi-organization users.
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOrganizationRequest {
    pub organization_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Body fallback; the refresh cookie wins when both are present.
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Session payload returned on register, login, select, accept, and refresh.
/// Tokens also travel as cookies; the body copy serves non-browser clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: SanitizedUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
    pub expires_in: i64,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user,
            organization: session.organization,
            role: session.role,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
            csrf_token: session.tokens.csrf_token,
            expires_in: session.tokens.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub requires_email_verification: bool,
}

/// Login body when the user belongs to more than one organization: an
/// unscoped session plus the list to pick from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSelectionResponse {
    pub requires_organization_selection: bool,
    pub organizations: Vec<OrganizationSummary>,
    #[serde(flatten)]
    pub session: SessionResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: SanitizedUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<crate::rbac::Permission>>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
