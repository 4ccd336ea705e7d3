use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error codes surfaced to clients in the `code` field.
///
/// Callers branch on the code, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidCredentials,
    AccountLocked,
    AccountDeactivated,
    WeakPassword,
    EmailExists,
    SlugExists,
    NotOrgMember,
    OrgSuspended,
    TrialExpired,
    InsufficientPermissions,
    InsufficientRole,
    InvalidToken,
    InvalidInvitation,
    AlreadyMember,
    MemberLimitReached,
    RateLimited,
    NotFound,
    ValidationFailed,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{1}")]
    BadRequest(ErrorCode, String),

    #[error("{1}")]
    Unauthorized(ErrorCode, String),

    #[error("{1}")]
    Forbidden(ErrorCode, String),

    #[error("{1}")]
    Conflict(ErrorCode, String),

    /// Account lockout; mapped to 423 Locked.
    #[error("{0}")]
    Locked(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    TooManyRequests { message: String, retry_after: u64 },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: ErrorCode,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, retry_after) = match self {
            AppError::BadRequest(code, msg) => (StatusCode::BAD_REQUEST, code, msg, None),
            AppError::Unauthorized(code, msg) => (StatusCode::UNAUTHORIZED, code, msg, None),
            AppError::Forbidden(code, msg) => (StatusCode::FORBIDDEN, code, msg, None),
            AppError::Conflict(code, msg) => (StatusCode::CONFLICT, code, msg, None),
            AppError::Locked(msg) => (StatusCode::LOCKED, ErrorCode::AccountLocked, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg, None),
            AppError::TooManyRequests {
                message,
                retry_after,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::RateLimited,
                message,
                Some(retry_after),
            ),
            AppError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::ValidationFailed,
                err.to_string(),
                None,
            ),
            AppError::Internal(err) => {
                // Persistence/network failures surface as a generic 5xx
                // without leaking internals.
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Internal,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut res = (
            status,
            Json(ErrorBody {
                error: message,
                code,
                retry_after,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::InvalidCredentials).unwrap();
        assert_eq!(json, "\"INVALID_CREDENTIALS\"");
        let json = serde_json::to_string(&ErrorCode::MemberLimitReached).unwrap();
        assert_eq!(json, "\"MEMBER_LIMIT_REACHED\"");
    }

    #[test]
    fn lockout_maps_to_423() {
        let res = AppError::Locked("Account locked. Try again in 30 minutes".into())
            .into_response();
        assert_eq!(res.status(), StatusCode::LOCKED);
    }

    #[test]
    fn rate_limit_sets_retry_after_header() {
        let res = AppError::TooManyRequests {
            message: "Too many requests".into(),
            retry_after: 42,
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get("retry-after").unwrap(), "42");
    }
}
