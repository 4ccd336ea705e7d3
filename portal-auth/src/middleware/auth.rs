//! Request authentication: cookie extraction, claim verification, live
//! membership resolution, and the double-submit CSRF check.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use portal_core::error::{AppError, ErrorCode};
use portal_core::middleware::rate_limit::RateLimitPrincipal;

use crate::models::{Organization, OrganizationMember, User};
use crate::rbac::{role_permissions, Permission, Role};
use crate::services::token::{AccessTokenClaims, ACCESS_TOKEN_COOKIE, CSRF_HEADER};
use crate::AppState;

/// Authenticated request principal. The organization and membership are
/// loaded fresh per request; the role claim inside the token is never
/// trusted over the live membership row.
#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
    pub claims: AccessTokenClaims,
    pub organization: Option<Organization>,
    pub membership: Option<OrganizationMember>,
}

impl AuthContext {
    /// Role used for authorization decisions. Super-admins act with the
    /// synthetic top role regardless of membership; everyone else needs an
    /// active membership in the token's organization.
    pub fn effective_role(&self) -> Option<Role> {
        if self.user.is_super_admin {
            Some(Role::SuperAdmin)
        } else {
            self.membership.as_ref().map(|m| m.role)
        }
    }

    pub fn permissions(&self) -> Vec<Permission> {
        match self.effective_role() {
            Some(Role::SuperAdmin) => Permission::ALL.to_vec(),
            Some(role) => role_permissions(role).to_vec(),
            None => Vec::new(),
        }
    }
}

impl RateLimitPrincipal for AuthContext {
    fn user_id(&self) -> Uuid {
        self.user.id
    }

    fn is_super_admin(&self) -> bool {
        self.user.is_super_admin
    }

    fn organization_id(&self) -> Option<Uuid> {
        self.organization.as_ref().map(|org| org.id)
    }
}

fn unauthorized(message: &str) -> AppError {
    AppError::Unauthorized(ErrorCode::InvalidToken, message.to_string())
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| unauthorized("Missing access token"))?;

    let claims = state
        .tokens
        .verify_access_token(&token)
        .map_err(|_| unauthorized("Invalid or expired token"))?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| unauthorized("Unknown user"))?;
    if !user.is_active {
        return Err(AppError::Forbidden(
            ErrorCode::AccountDeactivated,
            "Account is deactivated".to_string(),
        ));
    }

    // State-changing requests must also present the CSRF token in a header;
    // cookies alone never authorize a mutation.
    if requires_csrf(request.method()) {
        let presented = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        // The CSRF MAC is keyed to the active refresh-token hash, so tokens
        // from a logged-out or rotated session no longer verify.
        let session_key = user.refresh_token_hash.as_deref().unwrap_or_default();
        if !state.tokens.verify_csrf_token(presented, user.id, session_key) {
            return Err(AppError::Forbidden(
                ErrorCode::InvalidToken,
                "CSRF token missing or invalid".to_string(),
            ));
        }
    }

    let (organization, membership) = match claims.organization_id {
        Some(org_id) => {
            let membership = state
                .store
                .find_membership(org_id, user.id)
                .await
                .map_err(AppError::Internal)?
                .filter(|m| m.is_active);
            let organization = state
                .store
                .find_organization_by_id(org_id)
                .await
                .map_err(AppError::Internal)?;
            // A lapsed membership clears the tenant context rather than
            // failing the request outright; tenant-scoped guards then deny.
            if membership.is_some() || user.is_super_admin {
                (organization, membership)
            } else {
                (None, None)
            }
        }
        None => (None, None),
    };

    request.extensions_mut().insert(AuthContext {
        user,
        claims,
        organization,
        membership,
    });

    Ok(next.run(request).await)
}

fn requires_csrf(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Extractor for handlers running behind `auth_middleware`.
pub struct CurrentUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| unauthorized("Missing authentication context"))
    }
}
