use portal_core::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::utils::PasswordPolicyViolation;

/// Domain errors raised by the auth, invitation, and token services.
///
/// Each variant maps onto one stable machine-readable error code so that
/// clients can branch on `code` without parsing the human-readable message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account locked. Try again in {minutes_remaining} minutes")]
    AccountLocked { minutes_remaining: i64 },

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("{0}")]
    WeakPassword(PasswordPolicyViolation),

    #[error("A password is required to accept this invitation")]
    PasswordRequired,

    #[error("Slug may only contain lowercase letters, digits, and hyphens")]
    InvalidSlug,

    #[error("Email is already registered")]
    EmailExists,

    #[error("Organization slug is already taken")]
    SlugExists,

    #[error("Not an active member of this organization")]
    NotOrgMember,

    #[error("Organization is suspended")]
    OrgSuspended,

    #[error("Organization trial has expired")]
    TrialExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Insufficient role")]
    InsufficientRole,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invitation is invalid, expired, or no longer open")]
    InvalidInvitation,

    #[error("User is already an active member of this organization")]
    AlreadyMember,

    #[error("Organization has reached its member limit")]
    MemberLimitReached,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized(ErrorCode::InvalidCredentials, message)
            }
            AuthError::AccountLocked { .. } => AppError::Locked(message),
            AuthError::AccountDeactivated => {
                AppError::Forbidden(ErrorCode::AccountDeactivated, message)
            }
            AuthError::WeakPassword(_) => AppError::BadRequest(ErrorCode::WeakPassword, message),
            AuthError::PasswordRequired | AuthError::InvalidSlug => {
                AppError::BadRequest(ErrorCode::ValidationFailed, message)
            }
            AuthError::EmailExists => AppError::Conflict(ErrorCode::EmailExists, message),
            AuthError::SlugExists => AppError::Conflict(ErrorCode::SlugExists, message),
            AuthError::NotOrgMember => AppError::Forbidden(ErrorCode::NotOrgMember, message),
            AuthError::OrgSuspended => AppError::Forbidden(ErrorCode::OrgSuspended, message),
            AuthError::TrialExpired => AppError::Forbidden(ErrorCode::TrialExpired, message),
            AuthError::InsufficientPermissions => {
                AppError::Forbidden(ErrorCode::InsufficientPermissions, message)
            }
            AuthError::InsufficientRole => {
                AppError::Forbidden(ErrorCode::InsufficientRole, message)
            }
            AuthError::InvalidToken => AppError::Unauthorized(ErrorCode::InvalidToken, message),
            AuthError::InvalidInvitation => {
                AppError::BadRequest(ErrorCode::InvalidInvitation, message)
            }
            AuthError::AlreadyMember => AppError::Conflict(ErrorCode::AlreadyMember, message),
            AuthError::MemberLimitReached => {
                AppError::Conflict(ErrorCode::MemberLimitReached, message)
            }
            AuthError::Internal(source) => AppError::Internal(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn locked_account_maps_to_423() {
        let err: AppError = AuthError::AccountLocked {
            minutes_remaining: 12,
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::LOCKED);
    }

    #[test]
    fn invalid_credentials_maps_to_401() {
        let err: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn conflicts_map_to_409() {
        for err in [
            AuthError::EmailExists,
            AuthError::SlugExists,
            AuthError::AlreadyMember,
            AuthError::MemberLimitReached,
        ] {
            let app: AppError = err.into();
            assert_eq!(app.into_response().status(), StatusCode::CONFLICT);
        }
    }
}
