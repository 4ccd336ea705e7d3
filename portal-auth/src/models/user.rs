//! User model - identity records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity. Email is unique case-insensitively; the stored value is
/// normalized to lowercase on creation. Never hard-deleted: deactivation
/// flips `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_super_admin: bool,
    pub email_verified: bool,
    pub is_active: bool,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    /// Single active refresh token, stored as a hash, never in cleartext.
    pub refresh_token_hash: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Tenant context the last issued session was scoped to; re-resolved
    /// against the live membership on refresh.
    pub current_organization_id: Option<Uuid>,
    pub verification_token_hash: Option<String>,
    pub verification_token_expires_at: Option<DateTime<Utc>>,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String, first_name: String, last_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            password_hash,
            first_name,
            last_name,
            is_super_admin: false,
            email_verified: false,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            refresh_token_hash: None,
            refresh_token_expires_at: None,
            current_organization_id: None,
            verification_token_hash: None,
            verification_token_expires_at: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.locked_until, Some(until) if until > Utc::now())
    }

    /// Convert to sanitized response (no credential material).
    pub fn sanitized(&self) -> SanitizedUser {
        SanitizedUser {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_super_admin: self.is_super_admin,
            email_verified: self.email_verified,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

/// User representation for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_super_admin: bool,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
