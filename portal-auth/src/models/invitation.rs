//! Invitation model - tenant invitations with pre-assigned roles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::Role;

/// Invitation lifecycle states. `Expired` is implicit: a pending row whose
/// `expires_at` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Cancelled,
    Expired,
}

/// A pending invitation into a tenant. At most one pending row may exist per
/// (organization, email); a repeat invite becomes a resend against the same
/// row (new token, new expiry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationInvitation {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Normalized to lowercase, matching user email normalization.
    pub email: String,
    pub role: Role,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub invited_by: Uuid,
    pub department: Option<String>,
    pub title: Option<String>,
    pub term_start_date: Option<NaiveDate>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrganizationInvitation {
    pub fn new(
        organization_id: Uuid,
        email: String,
        role: Role,
        token_hash: String,
        expires_at: DateTime<Utc>,
        invited_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            email: email.trim().to_lowercase(),
            role,
            token_hash,
            expires_at,
            invited_by,
            department: None,
            title: None,
            term_start_date: None,
            accepted_at: None,
            cancelled_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> InvitationStatus {
        if self.accepted_at.is_some() {
            InvitationStatus::Accepted
        } else if self.cancelled_at.is_some() {
            InvitationStatus::Cancelled
        } else if self.expires_at <= Utc::now() {
            InvitationStatus::Expired
        } else {
            InvitationStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == InvitationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(expires_at: DateTime<Utc>) -> OrganizationInvitation {
        OrganizationInvitation::new(
            Uuid::new_v4(),
            "bob@acme.test".into(),
            Role::Trustee,
            "hash".into(),
            expires_at,
            Uuid::new_v4(),
        )
    }

    #[test]
    fn fresh_invitation_is_pending() {
        let inv = invitation(Utc::now() + chrono::Duration::days(7));
        assert_eq!(inv.status(), InvitationStatus::Pending);
        assert!(inv.is_pending());
    }

    #[test]
    fn past_expiry_is_expired() {
        let inv = invitation(Utc::now() - chrono::Duration::seconds(1));
        assert_eq!(inv.status(), InvitationStatus::Expired);
        assert!(!inv.is_pending());
    }

    #[test]
    fn terminal_states_win_over_expiry() {
        let mut inv = invitation(Utc::now() - chrono::Duration::days(1));
        inv.accepted_at = Some(Utc::now() - chrono::Duration::days(2));
        assert_eq!(inv.status(), InvitationStatus::Accepted);

        let mut inv = invitation(Utc::now() + chrono::Duration::days(7));
        inv.cancelled_at = Some(Utc::now());
        assert_eq!(inv.status(), InvitationStatus::Cancelled);
    }
}
