//! Environment-driven configuration. Everything has a development default
//! except the signing secrets, which are required outside of tests.

use std::env;

use anyhow::{Context, Result};

use portal_core::middleware::rate_limit::RateLimitConfig;

use crate::store::LockoutPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub csrf_secret: String,
    pub access_token_expiry_hours: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub port: u16,
    /// Public origin used in emailed links.
    pub base_url: String,
    pub allowed_origins: Vec<String>,
    pub jwt: JwtConfig,
    pub lockout: LockoutPolicy,
    pub rate_limit: RateLimitConfig,
    pub rate_limit_eviction_seconds: u64,
    /// Absent in development: emails are logged, not delivered.
    pub smtp: Option<SmtpConfig>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_env();

        let jwt = JwtConfig {
            secret: require_env("JWT_SECRET", environment)?,
            csrf_secret: require_env("CSRF_SECRET", environment)?,
            access_token_expiry_hours: parse_env("ACCESS_TOKEN_EXPIRY_HOURS", 24)?,
            refresh_token_expiry_days: parse_env("REFRESH_TOKEN_EXPIRY_DAYS", 7)?,
        };

        let lockout = LockoutPolicy {
            max_failed_attempts: parse_env("LOCKOUT_MAX_FAILED_ATTEMPTS", 5)?,
            lockout_duration_minutes: parse_env("LOCKOUT_DURATION_MINUTES", 30)?,
        };

        let rate_limit = RateLimitConfig {
            window_seconds: parse_env("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            ip_max: parse_env("RATE_LIMIT_IP_MAX", 30)?,
            user_max: parse_env("RATE_LIMIT_USER_MAX", 120)?,
            super_admin_user_max: parse_env("RATE_LIMIT_SUPER_ADMIN_MAX", 600)?,
            org_max: parse_env("RATE_LIMIT_ORG_MAX", 600)?,
        };

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                username: get_env("SMTP_USERNAME")?,
                password: get_env("SMTP_PASSWORD")?,
                from: get_env("SMTP_FROM")?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            environment,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "portal-auth".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            port: parse_env("PORT", 3001)?,
            base_url: env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            jwt,
            lockout,
            rate_limit,
            rate_limit_eviction_seconds: parse_env("RATE_LIMIT_EVICTION_SECONDS", 60)?,
            smtp,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("missing environment variable: {name}"))
}

/// Secrets must be set explicitly in production; development falls back to
/// a fixed value so the service starts out of the box.
fn require_env(name: &str, environment: Environment) -> Result<String> {
    match env::var(name) {
        Ok(value) => Ok(value),
        Err(_) if environment == Environment::Development => {
            Ok(format!("dev-only-{}", name.to_lowercase()))
        }
        Err(_) => anyhow::bail!("missing environment variable: {name}"),
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("invalid value for {name}: {value}")),
        Err(_) => Ok(default),
    }
}
