//! Process-local store. Used by tests and single-node deployments; the
//! dashmap entry guards make the conditional-update primitives atomic per
//! row.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    AuditLogEntry, Organization, OrganizationInvitation, OrganizationMember, User,
};

use super::{AuthStore, FailedLoginOutcome, LockoutPolicy};

#[derive(Default)]
pub struct InMemoryStore {
    users: DashMap<Uuid, User>,
    organizations: DashMap<Uuid, Organization>,
    members: DashMap<Uuid, OrganizationMember>,
    invitations: DashMap<Uuid, OrganizationInvitation>,
    audit_log: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit log, oldest first. Test helper.
    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.audit_log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|u| u.email == needle)
            .map(|u| u.clone()))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        self.users.insert(user.id, updated);
        Ok(())
    }

    async fn record_failed_login(
        &self,
        user_id: Uuid,
        policy: &LockoutPolicy,
    ) -> Result<FailedLoginOutcome> {
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {user_id}"))?;

        user.failed_login_attempts += 1;
        user.updated_at = Utc::now();

        if user.failed_login_attempts >= policy.max_failed_attempts {
            let locked_until =
                Utc::now() + chrono::Duration::minutes(policy.lockout_duration_minutes);
            user.locked_until = Some(locked_until);
            Ok(FailedLoginOutcome::Locked { locked_until })
        } else {
            Ok(FailedLoginOutcome::Counted {
                attempts: user.failed_login_attempts,
            })
        }
    }

    async fn clear_login_failures(&self, user_id: Uuid) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.failed_login_attempts = 0;
            user.locked_until = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_refresh_token(
        &self,
        user_id: Uuid,
        hash: &str,
        expires_at: DateTime<Utc>,
        current_organization_id: Option<Uuid>,
    ) -> Result<()> {
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {user_id}"))?;
        user.refresh_token_hash = Some(hash.to_string());
        user.refresh_token_expires_at = Some(expires_at);
        user.current_organization_id = current_organization_id;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {user_id}"))?;

        // Conditioned on the hash matching at write time, not just at read
        // time; the entry guard holds the row lock across the swap.
        if user.refresh_token_hash.as_deref() != Some(expected_hash) {
            return Ok(false);
        }
        user.refresh_token_hash = Some(new_hash.to_string());
        user.refresh_token_expires_at = Some(new_expires_at);
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn clear_refresh_token(&self, user_id: Uuid) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.refresh_token_hash = None;
            user.refresh_token_expires_at = None;
            user.current_organization_id = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_user_by_refresh_hash(&self, hash: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.refresh_token_hash.as_deref() == Some(hash))
            .map(|u| u.clone()))
    }

    async fn find_user_by_verification_hash(&self, hash: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.verification_token_hash.as_deref() == Some(hash))
            .map(|u| u.clone()))
    }

    async fn find_user_by_reset_hash(&self, hash: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.reset_token_hash.as_deref() == Some(hash))
            .map(|u| u.clone()))
    }

    async fn insert_organization(&self, org: &Organization) -> Result<()> {
        self.organizations.insert(org.id, org.clone());
        Ok(())
    }

    async fn find_organization_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.organizations.get(&id).map(|o| o.clone()))
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        Ok(self
            .organizations
            .iter()
            .find(|o| o.slug == slug)
            .map(|o| o.clone()))
    }

    async fn insert_member(&self, member: &OrganizationMember) -> Result<()> {
        self.members.insert(member.id, member.clone());
        Ok(())
    }

    async fn update_member(&self, member: &OrganizationMember) -> Result<()> {
        self.members.insert(member.id, member.clone());
        Ok(())
    }

    async fn find_membership(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationMember>> {
        Ok(self
            .members
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .map(|m| m.clone()))
    }

    async fn memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Organization, OrganizationMember)>> {
        let mut out = Vec::new();
        for member in self.members.iter().filter(|m| m.user_id == user_id) {
            if let Some(org) = self.organizations.get(&member.organization_id) {
                out.push((org.clone(), member.clone()));
            }
        }
        out.sort_by(|a, b| a.1.joined_at.cmp(&b.1.joined_at));
        Ok(out)
    }

    async fn count_active_members(&self, organization_id: Uuid) -> Result<u32> {
        Ok(self
            .members
            .iter()
            .filter(|m| m.organization_id == organization_id && m.is_active)
            .count() as u32)
    }

    async fn find_pending_invitation(
        &self,
        organization_id: Uuid,
        email: &str,
    ) -> Result<Option<OrganizationInvitation>> {
        let needle = email.trim().to_lowercase();
        Ok(self
            .invitations
            .iter()
            .find(|i| i.organization_id == organization_id && i.email == needle && i.is_pending())
            .map(|i| i.clone()))
    }

    async fn upsert_pending_invitation(
        &self,
        invitation: OrganizationInvitation,
    ) -> Result<OrganizationInvitation> {
        let existing_id = self
            .invitations
            .iter()
            .find(|i| {
                i.organization_id == invitation.organization_id
                    && i.email == invitation.email
                    && i.is_pending()
            })
            .map(|i| i.id);

        if let Some(id) = existing_id {
            // Resend: same row, fresh token and expiry.
            let mut row = self
                .invitations
                .get_mut(&id)
                .ok_or_else(|| anyhow::anyhow!("invitation disappeared: {id}"))?;
            row.role = invitation.role;
            row.token_hash = invitation.token_hash;
            row.expires_at = invitation.expires_at;
            row.invited_by = invitation.invited_by;
            row.department = invitation.department;
            row.title = invitation.title;
            row.term_start_date = invitation.term_start_date;
            return Ok(row.clone());
        }

        self.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<OrganizationInvitation>> {
        Ok(self
            .invitations
            .iter()
            .find(|i| i.token_hash == token_hash)
            .map(|i| i.clone()))
    }

    async fn find_invitation_by_id(
        &self,
        organization_id: Uuid,
        invitation_id: Uuid,
    ) -> Result<Option<OrganizationInvitation>> {
        Ok(self
            .invitations
            .get(&invitation_id)
            .filter(|i| i.organization_id == organization_id)
            .map(|i| i.clone()))
    }

    async fn update_invitation(&self, invitation: &OrganizationInvitation) -> Result<()> {
        self.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn invitations_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationInvitation>> {
        let mut out: Vec<_> = self
            .invitations
            .iter()
            .filter(|i| i.organization_id == organization_id)
            .map(|i| i.clone())
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn append_audit_entry(&self, entry: AuditLogEntry) -> Result<()> {
        self.audit_log
            .lock()
            .map_err(|_| anyhow::anyhow!("audit log mutex poisoned"))?
            .push(entry);
        Ok(())
    }
}
