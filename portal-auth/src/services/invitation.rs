//! Tenant invitations: create/resend, cancel, preview, and accept.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::dtos::invitation::{AcceptInvitationRequest, CreateInvitationRequest};
use crate::models::{
    AuditLogEntry, Organization, OrganizationInvitation, OrganizationMember, User,
};
use crate::rbac::{invitable_roles, Role};
use crate::services::audit::AuditService;
use crate::services::auth::{check_subscription, hash_password_blocking, spawn_email};
use crate::services::email::EmailProvider;
use crate::services::error::AuthError;
use crate::services::session::{issue_session, Session};
use crate::services::token::{hash_token, random_token, TokenService};
use crate::store::AuthStore;
use crate::utils::{validate_password_strength, Password};

const INVITATION_DAYS: i64 = 7;

/// Result of a create call: a (possibly resent) invitation, or - when the
/// address belongs to a previously removed member - an immediate
/// reactivation with no invitation round trip.
pub enum InvitationOutcome {
    Invited(OrganizationInvitation),
    Reactivated(OrganizationMember),
}

/// What the public preview endpoint exposes about an invitation.
pub struct InvitationPreview {
    pub invitation: OrganizationInvitation,
    pub organization_name: String,
    pub inviter_name: String,
    /// Whether the invited address already has an account (no password
    /// needed on accept).
    pub existing_user: bool,
}

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn AuthStore>,
    tokens: TokenService,
    email: Arc<dyn EmailProvider>,
    audit: AuditService,
    base_url: String,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        tokens: TokenService,
        email: Arc<dyn EmailProvider>,
        audit: AuditService,
        base_url: String,
    ) -> Self {
        Self {
            store,
            tokens,
            email,
            audit,
            base_url,
        }
    }

    /// Invite an email address into the organization with a pre-assigned
    /// role. Re-inviting a pending address resends against the same row;
    /// inviting a removed member reactivates the membership directly.
    pub async fn create(
        &self,
        organization_id: Uuid,
        inviter: &User,
        inviter_role: Role,
        req: CreateInvitationRequest,
        ip: Option<String>,
    ) -> Result<InvitationOutcome, AuthError> {
        if !invitable_roles(inviter_role).contains(&req.role) {
            return Err(AuthError::InsufficientRole);
        }

        let org = self
            .store
            .find_organization_by_id(organization_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("organization not found: {organization_id}"))?;
        check_subscription(&org)?;

        if self.store.count_active_members(org.id).await? >= org.member_limit {
            return Err(AuthError::MemberLimitReached);
        }

        let email = req.email.trim().to_lowercase();
        if let Some(user) = self.store.find_user_by_email(&email).await? {
            if let Some(membership) = self.store.find_membership(org.id, user.id).await? {
                if membership.is_active {
                    return Err(AuthError::AlreadyMember);
                }
                return self
                    .reactivate(org, membership, user, &req, inviter, ip)
                    .await;
            }
        }

        let resend = self
            .store
            .find_pending_invitation(org.id, &email)
            .await?
            .is_some();

        let token = random_token();
        let mut invitation = OrganizationInvitation::new(
            org.id,
            email,
            req.role,
            hash_token(&token),
            Utc::now() + Duration::days(INVITATION_DAYS),
            inviter.id,
        );
        invitation.department = req.department;
        invitation.title = req.title;
        invitation.term_start_date = req.term_start_date;
        let invitation = self.store.upsert_pending_invitation(invitation).await?;

        let provider = Arc::clone(&self.email);
        let to = invitation.email.clone();
        let org_name = org.name.clone();
        let inviter_name = format!("{} {}", inviter.first_name, inviter.last_name);
        let url = format!("{}/invitations/{token}", self.base_url);
        spawn_email(async move {
            provider
                .send_invitation_email(&to, &org_name, &inviter_name, &url)
                .await
        });

        self.audit.log(
            AuditLogEntry::new(
                if resend {
                    "invitation.resent"
                } else {
                    "invitation.created"
                },
                "invitation",
            )
            .organization(org.id)
            .user(inviter.id)
            .resource(invitation.id.to_string())
            .details(json!({ "email": invitation.email, "role": invitation.role }))
            .ip(ip),
        );

        Ok(InvitationOutcome::Invited(invitation))
    }

    pub async fn cancel(
        &self,
        organization_id: Uuid,
        invitation_id: Uuid,
        canceller: &User,
        canceller_role: Role,
        ip: Option<String>,
    ) -> Result<OrganizationInvitation, AuthError> {
        let mut invitation = self
            .store
            .find_invitation_by_id(organization_id, invitation_id)
            .await?
            .ok_or(AuthError::InvalidInvitation)?;

        if !invitation.is_pending() {
            return Err(AuthError::InvalidInvitation);
        }
        if !invitable_roles(canceller_role).contains(&invitation.role) {
            return Err(AuthError::InsufficientRole);
        }

        invitation.cancelled_at = Some(Utc::now());
        self.store.update_invitation(&invitation).await?;

        self.audit.log(
            AuditLogEntry::new("invitation.cancelled", "invitation")
                .organization(organization_id)
                .user(canceller.id)
                .resource(invitation.id.to_string())
                .ip(ip),
        );

        Ok(invitation)
    }

    /// Unauthenticated lookup for the acceptance page.
    pub async fn preview(&self, token: &str) -> Result<InvitationPreview, AuthError> {
        let invitation = self
            .store
            .find_invitation_by_token_hash(&hash_token(token))
            .await?
            .ok_or(AuthError::InvalidInvitation)?;

        let organization_name = self
            .store
            .find_organization_by_id(invitation.organization_id)
            .await?
            .map(|org| org.name)
            .unwrap_or_default();
        let inviter_name = self
            .store
            .find_user_by_id(invitation.invited_by)
            .await?
            .map(|u| format!("{} {}", u.first_name, u.last_name))
            .unwrap_or_default();
        let existing_user = self
            .store
            .find_user_by_email(&invitation.email)
            .await?
            .is_some();

        Ok(InvitationPreview {
            invitation,
            organization_name,
            inviter_name,
            existing_user,
        })
    }

    /// Accept an invitation. The granted role comes from the stored
    /// invitation row alone; nothing in the request can change it.
    pub async fn accept(
        &self,
        token: &str,
        req: AcceptInvitationRequest,
        ip: Option<String>,
    ) -> Result<Session, AuthError> {
        let mut invitation = self
            .store
            .find_invitation_by_token_hash(&hash_token(token))
            .await?
            .ok_or(AuthError::InvalidInvitation)?;
        if !invitation.is_pending() {
            return Err(AuthError::InvalidInvitation);
        }

        let org = self
            .store
            .find_organization_by_id(invitation.organization_id)
            .await?
            .ok_or(AuthError::InvalidInvitation)?;
        check_subscription(&org)?;

        if self.store.count_active_members(org.id).await? >= org.member_limit {
            return Err(AuthError::MemberLimitReached);
        }

        let user = match self.store.find_user_by_email(&invitation.email).await? {
            Some(existing) => {
                if !existing.is_active {
                    return Err(AuthError::AccountDeactivated);
                }
                existing
            }
            None => self.register_invited_user(&invitation, req).await?,
        };

        let member = match self.store.find_membership(org.id, user.id).await? {
            Some(existing) if existing.is_active => return Err(AuthError::AlreadyMember),
            Some(mut lapsed) => {
                lapsed.is_active = true;
                lapsed.role = invitation.role;
                lapsed.department = invitation.department.clone();
                lapsed.title = invitation.title.clone();
                if let Some(start) = invitation.term_start_date {
                    lapsed = lapsed.with_term(start, org.term_length_years);
                }
                self.store.update_member(&lapsed).await?;
                lapsed
            }
            None => {
                let mut member = OrganizationMember::new(org.id, user.id, invitation.role);
                member.department = invitation.department.clone();
                member.title = invitation.title.clone();
                if let Some(start) = invitation.term_start_date {
                    member = member.with_term(start, org.term_length_years);
                }
                self.store.insert_member(&member).await?;
                member
            }
        };

        invitation.accepted_at = Some(Utc::now());
        self.store.update_invitation(&invitation).await?;

        let provider = Arc::clone(&self.email);
        let to = user.email.clone();
        let org_name = org.name.clone();
        spawn_email(async move { provider.send_welcome_email(&to, &org_name).await });

        if let Some(inviter) = self.store.find_user_by_id(invitation.invited_by).await? {
            let provider = Arc::clone(&self.email);
            let to = inviter.email.clone();
            let invitee = user.email.clone();
            let org_name = org.name.clone();
            spawn_email(async move {
                provider
                    .send_invitation_accepted_email(&to, &invitee, &org_name)
                    .await
            });
        }

        self.audit.log(
            AuditLogEntry::new("invitation.accepted", "invitation")
                .organization(org.id)
                .user(user.id)
                .resource(invitation.id.to_string())
                .details(json!({ "role": member.role }))
                .ip(ip),
        );

        issue_session(&self.store, &self.tokens, &user, Some((&org, member.role))).await
    }

    pub async fn list(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationInvitation>, AuthError> {
        Ok(self
            .store
            .invitations_for_organization(organization_id)
            .await?)
    }

    async fn reactivate(
        &self,
        org: Organization,
        mut membership: OrganizationMember,
        user: User,
        req: &CreateInvitationRequest,
        inviter: &User,
        ip: Option<String>,
    ) -> Result<InvitationOutcome, AuthError> {
        membership.is_active = true;
        membership.role = req.role;
        membership.department = req.department.clone();
        membership.title = req.title.clone();
        if let Some(start) = req.term_start_date {
            membership = membership.with_term(start, org.term_length_years);
        }
        self.store.update_member(&membership).await?;

        let provider = Arc::clone(&self.email);
        let to = user.email.clone();
        let org_name = org.name.clone();
        spawn_email(async move { provider.send_welcome_email(&to, &org_name).await });

        self.audit.log(
            AuditLogEntry::new("member.reactivated", "member")
                .organization(org.id)
                .user(inviter.id)
                .resource(membership.id.to_string())
                .details(json!({ "email": user.email, "role": membership.role }))
                .ip(ip),
        );

        Ok(InvitationOutcome::Reactivated(membership))
    }

    /// First-time accept: the invitation doubles as email verification, so
    /// the new account starts out verified.
    async fn register_invited_user(
        &self,
        invitation: &OrganizationInvitation,
        req: AcceptInvitationRequest,
    ) -> Result<User, AuthError> {
        let password = req.password.ok_or(AuthError::PasswordRequired)?;
        validate_password_strength(&password).map_err(AuthError::WeakPassword)?;
        let password_hash = hash_password_blocking(Password::new(password)).await?;

        let mut user = User::new(
            invitation.email.clone(),
            password_hash.into_string(),
            req.first_name.unwrap_or_default(),
            req.last_name.unwrap_or_default(),
        );
        user.email_verified = true;
        self.store.insert_user(&user).await?;
        Ok(user)
    }
}
