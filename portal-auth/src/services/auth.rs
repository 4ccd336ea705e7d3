//! Registration, login, session refresh, and credential lifecycle.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::dtos::auth::{LoginRequest, RegisterRequest};
use crate::models::{
    is_valid_slug, AuditLogEntry, Organization, OrganizationMember, OrganizationSummary, User,
};
use crate::rbac::Role;
use crate::services::audit::AuditService;
use crate::services::email::EmailProvider;
use crate::services::error::AuthError;
use crate::services::session::{issue_session, Session, SessionTokens};
use crate::services::token::{hash_token, random_token, TokenService};
use crate::store::{AuthStore, FailedLoginOutcome, LockoutPolicy};
use crate::utils::{
    hash_password, validate_password_strength, verify_password, Password, PasswordHashString,
};

const VERIFICATION_TOKEN_HOURS: i64 = 24;
const RESET_TOKEN_HOURS: i64 = 1;

/// Argon2id hash of a throwaway password. Unknown-email logins verify the
/// submitted password against it so both login paths cost one argon2 run
/// and response time does not reveal whether an address is registered.
const TIMING_PAD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$YXV0aHNlcnZpY2VkdW1teQ$bG9naW4tdGltaW5nLXBhZGRpbmctMzItYnl0ZXMhISE";

/// What a successful password check produces: a tenant-scoped session, or -
/// when the user belongs to more than one organization - an unscoped session
/// plus the list to choose from.
pub enum LoginOutcome {
    Session(Box<Session>),
    SelectOrganization {
        session: Box<Session>,
        organizations: Vec<OrganizationSummary>,
    },
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    tokens: TokenService,
    email: Arc<dyn EmailProvider>,
    audit: AuditService,
    lockout: LockoutPolicy,
    base_url: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        tokens: TokenService,
        email: Arc<dyn EmailProvider>,
        audit: AuditService,
        lockout: LockoutPolicy,
        base_url: String,
    ) -> Self {
        Self {
            store,
            tokens,
            email,
            audit,
            lockout,
            base_url,
        }
    }

    /// Create an organization and its owner in one step. The caller becomes
    /// an active `Owner` member and gets a session immediately; email
    /// verification happens out of band.
    pub async fn register(
        &self,
        req: RegisterRequest,
        ip: Option<String>,
    ) -> Result<Session, AuthError> {
        if !is_valid_slug(&req.slug) {
            return Err(AuthError::InvalidSlug);
        }
        validate_password_strength(&req.password).map_err(AuthError::WeakPassword)?;

        if self
            .store
            .find_organization_by_slug(&req.slug)
            .await?
            .is_some()
        {
            return Err(AuthError::SlugExists);
        }
        let email = req.email.trim().to_lowercase();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let password_hash = hash_password_blocking(Password::new(req.password)).await?;

        let organization = Organization::new(req.organization_name, req.slug);
        self.store.insert_organization(&organization).await?;

        let mut user = User::new(
            email,
            password_hash.into_string(),
            req.first_name,
            req.last_name,
        );
        let verification = random_token();
        user.verification_token_hash = Some(hash_token(&verification));
        user.verification_token_expires_at =
            Some(Utc::now() + Duration::hours(VERIFICATION_TOKEN_HOURS));
        self.store.insert_user(&user).await?;

        let member = OrganizationMember::new(organization.id, user.id, Role::Owner);
        self.store.insert_member(&member).await?;

        let provider = Arc::clone(&self.email);
        let to = user.email.clone();
        let url = format!("{}/verify-email?token={verification}", self.base_url);
        spawn_email(async move { provider.send_verification_email(&to, &url).await });

        self.audit.log(
            AuditLogEntry::new("auth.register", "user")
                .organization(organization.id)
                .user(user.id)
                .resource(user.id.to_string())
                .details(json!({ "slug": organization.slug }))
                .ip(ip),
        );

        issue_session(&self.store, &self.tokens, &user, Some((&organization, Role::Owner))).await
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        ip: Option<String>,
    ) -> Result<LoginOutcome, AuthError> {
        let email = req.email.trim().to_lowercase();
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            let _ = verify_password_blocking(
                Password::new(req.password),
                TIMING_PAD_HASH.to_string(),
            )
            .await?;
            return Err(AuthError::InvalidCredentials);
        };

        // Lockout is reported before the password is checked, so a locked
        // account never reveals whether a guess was correct.
        if user.is_locked() {
            let until = user.locked_until.unwrap_or_else(Utc::now);
            return Err(AuthError::AccountLocked {
                minutes_remaining: minutes_until(until),
            });
        }

        let password_ok =
            verify_password_blocking(Password::new(req.password), user.password_hash.clone())
                .await?;
        if !password_ok {
            return Err(self.handle_failed_login(&user, ip).await?);
        }

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }
        if user.failed_login_attempts > 0 || user.locked_until.is_some() {
            self.store.clear_login_failures(user.id).await?;
        }

        let context = match req.organization_id {
            Some(org_id) => Some(self.resolve_context(&user, org_id).await?),
            None => {
                let mut memberships = self.store.memberships_for_user(user.id).await?;
                memberships.retain(|(org, member)| member.is_active && org.is_active);
                match memberships.len() {
                    0 => None,
                    1 => {
                        let (org, member) = memberships.remove(0);
                        check_subscription(&org)?;
                        Some((org, member.role))
                    }
                    _ => {
                        // Unscoped session: enough to call the selection
                        // endpoint, authorizes nothing tenant-specific.
                        self.audit.log(
                            AuditLogEntry::new("auth.login", "session")
                                .user(user.id)
                                .ip(ip),
                        );
                        let session =
                            issue_session(&self.store, &self.tokens, &user, None).await?;
                        return Ok(LoginOutcome::SelectOrganization {
                            session: Box::new(session),
                            organizations: memberships
                                .iter()
                                .map(|(org, _)| org.into())
                                .collect(),
                        });
                    }
                }
            }
        };

        let mut entry = AuditLogEntry::new("auth.login", "session").user(user.id).ip(ip);
        if let Some((org, _)) = &context {
            entry = entry.organization(org.id);
        }
        self.audit.log(entry);

        let session = issue_session(
            &self.store,
            &self.tokens,
            &user,
            context.as_ref().map(|(org, role)| (org, *role)),
        )
        .await?;
        Ok(LoginOutcome::Session(Box::new(session)))
    }

    /// Scope an already-authenticated user into one of their organizations.
    pub async fn select_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        ip: Option<String>,
    ) -> Result<Session, AuthError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let (org, role) = self.resolve_context(&user, organization_id).await?;

        self.audit.log(
            AuditLogEntry::new("auth.select_organization", "session")
                .organization(org.id)
                .user(user.id)
                .ip(ip),
        );

        issue_session(&self.store, &self.tokens, &user, Some((&org, role))).await
    }

    /// Rotate the refresh token and mint a fresh access token. Rotation is a
    /// compare-and-swap against the presented hash: of two concurrent
    /// refreshes with the same token, exactly one wins and the other gets
    /// `InvalidToken`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let presented_hash = hash_token(refresh_token);
        let user = self
            .store
            .find_user_by_refresh_hash(&presented_hash)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        match user.refresh_token_expires_at {
            Some(expires_at) if expires_at > Utc::now() => {}
            _ => return Err(AuthError::InvalidToken),
        }
        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        // The context embedded at issue time is advisory. Re-derive it from
        // the live membership; if that no longer authorizes the organization,
        // the new session carries no tenant context.
        let context = match user.current_organization_id {
            Some(org_id) => match self.resolve_context(&user, org_id).await {
                Ok(ctx) => Some(ctx),
                Err(
                    AuthError::NotOrgMember | AuthError::OrgSuspended | AuthError::TrialExpired,
                ) => None,
                Err(other) => return Err(other),
            },
            None => None,
        };

        let replacement = self.tokens.issue_refresh_token();
        let rotated = self
            .store
            .rotate_refresh_token(
                user.id,
                &presented_hash,
                &replacement.hash,
                replacement.expires_at,
            )
            .await?;
        if !rotated {
            return Err(AuthError::InvalidToken);
        }
        if context.is_none() && user.current_organization_id.is_some() {
            // Membership lapsed since issue time; drop the stored context.
            self.store
                .set_refresh_token(user.id, &replacement.hash, replacement.expires_at, None)
                .await?;
        }

        let access_token = self
            .tokens
            .issue_access_token(&user, context.as_ref().map(|(org, role)| (org.id, *role)))?;

        Ok(Session {
            tokens: SessionTokens {
                access_token,
                refresh_token: replacement.token,
                csrf_token: self.tokens.issue_csrf_token(user.id, &replacement.hash),
                expires_in: self.tokens.access_token_expiry_seconds(),
            },
            user: user.sanitized(),
            organization: context.as_ref().map(|(org, _)| org.into()),
            role: context.as_ref().map(|(_, role)| *role),
        })
    }

    pub async fn logout(&self, user_id: Uuid, ip: Option<String>) -> Result<(), AuthError> {
        self.store.clear_refresh_token(user_id).await?;
        self.audit.log(
            AuditLogEntry::new("auth.logout", "session")
                .user(user_id)
                .ip(ip),
        );
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let hash = hash_token(token);
        let mut user = self
            .store
            .find_user_by_verification_hash(&hash)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        match user.verification_token_expires_at {
            Some(expires_at) if expires_at > Utc::now() => {}
            _ => return Err(AuthError::InvalidToken),
        }

        user.email_verified = true;
        user.verification_token_hash = None;
        user.verification_token_expires_at = None;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        self.audit
            .log(AuditLogEntry::new("auth.email_verified", "user").user(user.id));
        Ok(())
    }

    /// Always succeeds from the caller's point of view, whether or not the
    /// email matches an account. Prevents probing for registered addresses.
    pub async fn request_password_reset(
        &self,
        email: &str,
        ip: Option<String>,
    ) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        if let Some(mut user) = self.store.find_user_by_email(&email).await? {
            if user.is_active {
                let token = random_token();
                user.reset_token_hash = Some(hash_token(&token));
                user.reset_token_expires_at = Some(Utc::now() + Duration::hours(RESET_TOKEN_HOURS));
                user.updated_at = Utc::now();
                self.store.update_user(&user).await?;

                let provider = Arc::clone(&self.email);
                let to = user.email.clone();
                let url = format!("{}/reset-password?token={token}", self.base_url);
                spawn_email(async move { provider.send_password_reset_email(&to, &url).await });

                self.audit.log(
                    AuditLogEntry::new("auth.password_reset_requested", "user")
                        .user(user.id)
                        .ip(ip),
                );
            }
        }
        Ok(())
    }

    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: String,
        ip: Option<String>,
    ) -> Result<(), AuthError> {
        let hash = hash_token(token);
        let mut user = self
            .store
            .find_user_by_reset_hash(&hash)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        match user.reset_token_expires_at {
            Some(expires_at) if expires_at > Utc::now() => {}
            _ => return Err(AuthError::InvalidToken),
        }
        validate_password_strength(&new_password).map_err(AuthError::WeakPassword)?;

        let password_hash = hash_password_blocking(Password::new(new_password)).await?;
        user.password_hash = password_hash.into_string();
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;
        user.failed_login_attempts = 0;
        user.locked_until = None;
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;

        // A reset invalidates the active session.
        self.store.clear_refresh_token(user.id).await?;

        self.audit.log(
            AuditLogEntry::new("auth.password_reset", "user")
                .user(user.id)
                .ip(ip),
        );
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: String,
        new_password: String,
        ip: Option<String>,
    ) -> Result<(), AuthError> {
        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let current_ok =
            verify_password_blocking(Password::new(current_password), user.password_hash.clone())
                .await?;
        if !current_ok {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password_strength(&new_password).map_err(AuthError::WeakPassword)?;

        let password_hash = hash_password_blocking(Password::new(new_password)).await?;
        user.password_hash = password_hash.into_string();
        user.updated_at = Utc::now();
        self.store.update_user(&user).await?;
        self.store.clear_refresh_token(user.id).await?;

        self.audit.log(
            AuditLogEntry::new("auth.password_changed", "user")
                .user(user.id)
                .ip(ip),
        );
        Ok(())
    }

    async fn handle_failed_login(
        &self,
        user: &User,
        ip: Option<String>,
    ) -> Result<AuthError, AuthError> {
        match self.store.record_failed_login(user.id, &self.lockout).await? {
            FailedLoginOutcome::Counted { attempts } => {
                tracing::debug!(user_id = %user.id, attempts, "failed login attempt");
                Ok(AuthError::InvalidCredentials)
            }
            FailedLoginOutcome::Locked { locked_until } => {
                self.audit.log(
                    AuditLogEntry::new("auth.lockout", "user")
                        .user(user.id)
                        .details(json!({ "lockedUntil": locked_until }))
                        .ip(ip),
                );

                let provider = Arc::clone(&self.email);
                let to = user.email.clone();
                let minutes = self.lockout.lockout_duration_minutes;
                spawn_email(async move { provider.send_lockout_alert_email(&to, minutes).await });

                Ok(AuthError::AccountLocked {
                    minutes_remaining: minutes_until(locked_until),
                })
            }
        }
    }

    async fn resolve_context(
        &self,
        user: &User,
        organization_id: Uuid,
    ) -> Result<(Organization, Role), AuthError> {
        let membership = self
            .store
            .find_membership(organization_id, user.id)
            .await?
            .filter(|m| m.is_active)
            .ok_or(AuthError::NotOrgMember)?;
        let org = self
            .store
            .find_organization_by_id(organization_id)
            .await?
            .ok_or(AuthError::NotOrgMember)?;
        check_subscription(&org)?;
        Ok((org, membership.role))
    }
}

pub(crate) fn check_subscription(org: &Organization) -> Result<(), AuthError> {
    if org.is_suspended() {
        return Err(AuthError::OrgSuspended);
    }
    if org.trial_expired() {
        return Err(AuthError::TrialExpired);
    }
    Ok(())
}

pub(crate) fn spawn_email(fut: impl Future<Output = anyhow::Result<()>> + Send + 'static) {
    tokio::spawn(async move {
        if let Err(error) = fut.await {
            tracing::warn!(%error, "email delivery failed");
        }
    });
}

pub(crate) async fn hash_password_blocking(
    password: Password,
) -> Result<PasswordHashString, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(anyhow::anyhow!("hashing task failed: {e}")))?
        .map_err(AuthError::Internal)
}

async fn verify_password_blocking(
    password: Password,
    stored_hash: String,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        verify_password(&password, &PasswordHashString::new(stored_hash)).is_ok()
    })
    .await
    .map_err(|e| AuthError::Internal(anyhow::anyhow!("verification task failed: {e}")))
}

fn minutes_until(instant: DateTime<Utc>) -> i64 {
    let seconds = (instant - Utc::now()).num_seconds().max(0);
    (seconds + 59) / 60
}
