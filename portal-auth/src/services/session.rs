use std::sync::Arc;

use crate::models::{Organization, OrganizationSummary, SanitizedUser, User};
use crate::rbac::Role;
use crate::services::error::AuthError;
use crate::services::token::TokenService;
use crate::store::AuthStore;

/// Token triple for one issued session.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// Everything a successful authentication hands back: the token triple plus
/// the user and (when scoped) the tenant context the session was issued for.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: SessionTokens,
    pub user: SanitizedUser,
    pub organization: Option<OrganizationSummary>,
    pub role: Option<Role>,
}

/// Mint the token triple and persist the refresh-token hash. Issuing a new
/// refresh token invalidates any previous one for the user.
pub(crate) async fn issue_session(
    store: &Arc<dyn AuthStore>,
    tokens: &TokenService,
    user: &User,
    context: Option<(&Organization, Role)>,
) -> Result<Session, AuthError> {
    let access_token = tokens.issue_access_token(user, context.map(|(org, role)| (org.id, role)))?;
    let refresh = tokens.issue_refresh_token();

    store
        .set_refresh_token(
            user.id,
            &refresh.hash,
            refresh.expires_at,
            context.map(|(org, _)| org.id),
        )
        .await?;

    Ok(Session {
        tokens: SessionTokens {
            access_token,
            refresh_token: refresh.token,
            csrf_token: tokens.issue_csrf_token(user.id, &refresh.hash),
            expires_in: tokens.access_token_expiry_seconds(),
        },
        user: user.sanitized(),
        organization: context.map(|(org, _)| org.into()),
        role: context.map(|(_, role)| role),
    })
}
