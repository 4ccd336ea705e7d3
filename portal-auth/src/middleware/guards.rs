//! Route-level authorization guards. Each guard reads the `AuthContext`
//! extension installed by `auth_middleware`; the super-admin bypass lives
//! in the underlying predicates.

use std::future::Future;
use std::pin::Pin;

use axum::{extract::Request, middleware::Next, response::Response};

use portal_core::error::{AppError, ErrorCode};

use crate::middleware::auth::AuthContext;
use crate::rbac::{self, Permission, Role};

type GuardFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

fn context(request: &Request) -> Result<AuthContext, AppError> {
    request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| {
            AppError::Unauthorized(
                ErrorCode::InvalidToken,
                "Missing authentication context".to_string(),
            )
        })
}

fn tenant_role(ctx: &AuthContext) -> Result<Role, AppError> {
    ctx.effective_role().ok_or_else(|| {
        AppError::Forbidden(
            ErrorCode::NotOrgMember,
            "Not an active member of this organization".to_string(),
        )
    })
}

pub fn require_permission(
    permission: Permission,
) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let ctx = context(&request)?;
            let role = tenant_role(&ctx)?;
            if !rbac::has_permission(role, permission) {
                return Err(AppError::Forbidden(
                    ErrorCode::InsufficientPermissions,
                    "Insufficient permissions".to_string(),
                ));
            }
            Ok(next.run(request).await)
        })
    }
}

/// Exact-role guard. Super-admins pass regardless.
pub fn require_role(required: Role) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let ctx = context(&request)?;
            let role = tenant_role(&ctx)?;
            if role != Role::SuperAdmin && role != required {
                return Err(AppError::Forbidden(
                    ErrorCode::InsufficientRole,
                    "Insufficient role".to_string(),
                ));
            }
            Ok(next.run(request).await)
        })
    }
}

pub fn require_minimum_role(required: Role) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let ctx = context(&request)?;
            let role = tenant_role(&ctx)?;
            if !rbac::has_minimum_role(role, required) {
                return Err(AppError::Forbidden(
                    ErrorCode::InsufficientRole,
                    "Insufficient role".to_string(),
                ));
            }
            Ok(next.run(request).await)
        })
    }
}

pub async fn require_owner(request: Request, next: Next) -> Result<Response, AppError> {
    let ctx = context(&request)?;
    let role = tenant_role(&ctx)?;
    if !rbac::has_minimum_role(role, Role::Owner) {
        return Err(AppError::Forbidden(
            ErrorCode::InsufficientRole,
            "Owner access required".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let ctx = context(&request)?;
    if !ctx.user.is_super_admin {
        return Err(AppError::Forbidden(
            ErrorCode::InsufficientRole,
            "Super-admin access required".to_string(),
        ));
    }
    Ok(next.run(request).await)
}
