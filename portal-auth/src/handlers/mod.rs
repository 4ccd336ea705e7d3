pub mod auth;
pub mod invitation;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::config::Environment;
use crate::services::token::{ACCESS_TOKEN_COOKIE, CSRF_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::services::Session;

/// Install the session cookie triple. Access and refresh tokens are
/// httpOnly; the CSRF cookie is readable so the frontend can echo it back
/// in the request header.
pub(crate) fn with_session_cookies(
    jar: CookieJar,
    session: &Session,
    refresh_max_age_seconds: i64,
    environment: Environment,
) -> CookieJar {
    let secure = environment == Environment::Production;
    jar.add(build_cookie(
        ACCESS_TOKEN_COOKIE,
        session.tokens.access_token.clone(),
        session.tokens.expires_in,
        true,
        secure,
    ))
    .add(build_cookie(
        REFRESH_TOKEN_COOKIE,
        session.tokens.refresh_token.clone(),
        refresh_max_age_seconds,
        true,
        secure,
    ))
    .add(build_cookie(
        CSRF_TOKEN_COOKIE,
        session.tokens.csrf_token.clone(),
        refresh_max_age_seconds,
        false,
        secure,
    ))
}

pub(crate) fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(removal_cookie(ACCESS_TOKEN_COOKIE))
        .remove(removal_cookie(REFRESH_TOKEN_COOKIE))
        .remove(removal_cookie(CSRF_TOKEN_COOKIE))
}

fn build_cookie(
    name: &'static str,
    value: String,
    max_age_seconds: i64,
    http_only: bool,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_seconds))
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Best-effort client address for audit entries.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
