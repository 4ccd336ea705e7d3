//! Persistence boundary.
//!
//! Business entities live behind this trait; the auth core consumes CRUD
//! plus the atomic counter/conditional-update primitives it needs for
//! correctness under concurrency. `InMemoryStore` is the bundled
//! implementation; a relational backend implements the same contract.

mod memory;

pub use memory::InMemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AuditLogEntry, Organization, OrganizationInvitation, OrganizationMember, User,
};

/// Lockout parameters applied by the atomic failed-login counter.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lockout_duration_minutes: i64,
}

/// Result of recording one failed login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedLoginOutcome {
    Counted { attempts: u32 },
    Locked { locked_until: DateTime<Utc> },
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    // Users
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Case-insensitive email lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Atomically increment the failed-login counter, applying the lockout
    /// once the threshold is reached. Not a read-modify-write race: the
    /// increment happens under the row's write lock.
    async fn record_failed_login(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<FailedLoginOutcome>;

    async fn clear_login_failures(&self, user_id: Uuid) -> Result<()>;

    /// Store the (single) active refresh-token hash and the tenant context
    /// the session is scoped to.
    async fn set_refresh_token(
        &self,
        user_id: Uuid,
        hash: &str,
        expires_at: DateTime<Utc>,
        current_organization_id: Option<Uuid>,
    ) -> Result<()>;

    /// Compare-and-swap rotation: succeeds only if the stored hash still
    /// equals `expected_hash` at write time, so two concurrent refreshes
    /// cannot both succeed against the old hash.
    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn clear_refresh_token(&self, user_id: Uuid) -> Result<()>;
    async fn find_user_by_refresh_hash(&self, hash: &str) -> Result<Option<User>>;
    async fn find_user_by_verification_hash(&self, hash: &str) -> Result<Option<User>>;
    async fn find_user_by_reset_hash(&self, hash: &str) -> Result<Option<User>>;

    // Organizations
    async fn insert_organization(&self, org: &Organization) -> Result<()>;
    async fn find_organization_by_id(&self, id: Uuid) -> Result<Option<Organization>>;
    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    // Memberships
    async fn insert_member(&self, member: &OrganizationMember) -> Result<()>;
    async fn update_member(&self, member: &OrganizationMember) -> Result<()>;
    async fn find_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>>;
    async fn memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Organization, OrganizationMember)>>;
    async fn count_active_members(&self, organization_id: Uuid) -> Result<u32>;

    // Invitations
    async fn find_pending_invitation(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<Option<OrganizationInvitation>>;

    /// Insert the invitation, or - if a pending row already exists for the
    /// same (organization, email) - update that row in place (resend
    /// semantics). Returns the stored row.
    async fn upsert_pending_invitation(
        &self,
        invitation: OrganizationInvitation,
    ) -> Result<OrganizationInvitation>;

    async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<OrganizationInvitation>>;
    async fn find_invitation_by_id(
        &self,
        organization_id: Uuid,
        invitation_id: Uuid,
    ) -> Result<Option<OrganizationInvitation>>;
    async fn update_invitation(&self, invitation: &OrganizationInvitation) -> Result<()>;
    async fn invitations_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationInvitation>>;

    // Audit
    async fn append_audit_entry(&self, entry: AuditLogEntry) -> Result<()>;
}
