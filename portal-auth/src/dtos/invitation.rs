use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{InvitationStatus, OrganizationInvitation};
use crate::rbac::Role;
use crate::services::invitation::InvitationPreview;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    #[validate(email)]
    pub email: String,
    pub role: Role,
    pub department: Option<String>,
    pub title: Option<String>,
    pub term_start_date: Option<NaiveDate>,
}

/// Accept payload. A password is required only when the invited address has
/// no account yet. Unknown fields (including any client-supplied role) are
/// ignored; the granted role always comes from the stored invitation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationRequest {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub department: Option<String>,
    pub title: Option<String>,
    pub term_start_date: Option<NaiveDate>,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&OrganizationInvitation> for InvitationResponse {
    fn from(inv: &OrganizationInvitation) -> Self {
        Self {
            id: inv.id,
            organization_id: inv.organization_id,
            email: inv.email.clone(),
            role: inv.role,
            status: inv.status(),
            department: inv.department.clone(),
            title: inv.title.clone(),
            term_start_date: inv.term_start_date,
            invited_by: inv.invited_by,
            expires_at: inv.expires_at,
            created_at: inv.created_at,
        }
    }
}

/// Returned when inviting a previously removed member: the membership is
/// reactivated directly instead of issuing an invitation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactivatedMemberResponse {
    pub reactivated: bool,
    pub member_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

/// Public preview for the acceptance page; excludes anything not needed to
/// render the prompt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationPreviewResponse {
    pub organization_name: String,
    pub inviter_name: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub existing_user: bool,
}

impl From<InvitationPreview> for InvitationPreviewResponse {
    fn from(preview: InvitationPreview) -> Self {
        Self {
            organization_name: preview.organization_name,
            inviter_name: preview.inviter_name,
            email: preview.invitation.email.clone(),
            role: preview.invitation.role,
            status: preview.invitation.status(),
            expires_at: preview.invitation.expires_at,
            existing_user: preview.existing_user,
        }
    }
}
