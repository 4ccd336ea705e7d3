//! Keyed sliding-window rate limiting.
//!
//! Counters live behind the [`CounterStore`] trait so a single-process map
//! and a distributed cache are interchangeable implementations. Three scopes
//! can apply to one request: per-authenticated-user, per-source-IP, and
//! per-organization. Health-check traffic is exempt.

use std::{net::IpAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;

/// Counter state for one window.
#[derive(Debug, Clone)]
pub struct Window {
    pub count: u32,
    pub resets_at: DateTime<Utc>,
}

/// Storage for windowed counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key`, starting a fresh window when the
    /// previous one has expired. Returns the state after the increment.
    async fn increment(&self, key: &str, window: Duration) -> Window;

    /// Drop the counter for `key`.
    async fn reset(&self, key: &str);

    /// Drop all entries whose window has elapsed, to bound memory.
    async fn evict_expired(&self);
}

/// Process-local counter store. Horizontally scaled deployments swap in a
/// shared store to preserve the limit across processes.
#[derive(Default)]
pub struct InMemoryCounterStore {
    entries: DashMap<String, Window>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Window {
        let now = Utc::now();
        let span = chrono::Duration::seconds(window.as_secs() as i64);

        // The dashmap entry guard makes the whole read-modify-write atomic
        // with respect to concurrent increments on the same key.
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Window {
                count: 0,
                resets_at: now + span,
            });

        if entry.resets_at <= now {
            entry.count = 0;
            entry.resets_at = now + span;
        }
        entry.count += 1;

        Window {
            count: entry.count,
            resets_at: entry.resets_at,
        }
    }

    async fn reset(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn evict_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, window| window.resets_at > now);
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub ip_max: u32,
    pub user_max: u32,
    /// Authenticated super-admins get a materially higher per-user ceiling.
    pub super_admin_user_max: u32,
    pub org_max: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            ip_max: 30,
            user_max: 120,
            super_admin_user_max: 600,
            org_max: 600,
        }
    }
}

/// Applies windowed limits per scope against the injected store.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    async fn check_scope(&self, key: String, max: u32) -> Result<(), AppError> {
        let window = Duration::from_secs(self.config.window_seconds);
        let state = self.store.increment(&key, window).await;
        if state.count > max {
            let retry_after = (state.resets_at - Utc::now()).num_seconds().max(1) as u64;
            tracing::warn!(key = %key, count = state.count, "rate limit exceeded");
            return Err(AppError::TooManyRequests {
                message: "Too many requests. Please try again later.".to_string(),
                retry_after,
            });
        }
        Ok(())
    }

    /// Per-source-IP limit, applied unconditionally to auth endpoints.
    pub async fn check_ip(&self, ip: IpAddr) -> Result<(), AppError> {
        self.check_scope(format!("ip:{ip}"), self.config.ip_max).await
    }

    /// Per-user and per-organization limits for authenticated traffic.
    pub async fn check_principal(
        &self,
        user_id: Uuid,
        is_super_admin: bool,
        organization_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let user_max = if is_super_admin {
            self.config.super_admin_user_max
        } else {
            self.config.user_max
        };
        self.check_scope(format!("user:{user_id}"), user_max).await?;

        if let Some(org_id) = organization_id {
            self.check_scope(format!("org:{org_id}"), self.config.org_max)
                .await?;
        }
        Ok(())
    }

    /// Background sweep evicting expired window entries. Runs on a fixed
    /// interval independent of request traffic.
    pub fn start_eviction(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.store.evict_expired().await;
            }
        })
    }
}

/// Implemented by the request extension that identifies an authenticated
/// principal, so this crate needs no knowledge of the auth service's types.
pub trait RateLimitPrincipal: Send + Sync + 'static {
    fn user_id(&self) -> Uuid;
    fn is_super_admin(&self) -> bool;
    fn organization_id(&self) -> Option<Uuid>;
}

fn client_ip(request: &Request) -> Option<IpAddr> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<std::net::SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

/// Middleware applying the per-IP window. Health checks are exempt.
pub async fn ip_rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    match client_ip(&request) {
        Some(ip) => limiter.check_ip(ip).await?,
        None => tracing::warn!("could not determine client ip for rate limiting"),
    }

    Ok(next.run(request).await)
}

/// Middleware applying per-user and per-organization windows. Must run after
/// authentication so the principal extension is present.
pub async fn principal_rate_limit_middleware<T>(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: RateLimitPrincipal + Clone,
{
    if let Some(principal) = request.extensions().get::<T>() {
        limiter
            .check_principal(
                principal.user_id(),
                principal.is_super_admin(),
                principal.organization_id(),
            )
            .await?;
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(config: RateLimitConfig) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            config,
        ))
    }

    #[tokio::test]
    async fn ip_scope_rejects_over_limit() {
        let limiter = limiter(RateLimitConfig {
            ip_max: 3,
            ..Default::default()
        });
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(limiter.check_ip(ip).await.is_ok());
        }
        let err = limiter.check_ip(ip).await.unwrap_err();
        match err {
            AppError::TooManyRequests { retry_after, .. } => assert!(retry_after >= 1),
            other => panic!("expected TooManyRequests, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scopes_are_independent() {
        let limiter = limiter(RateLimitConfig {
            ip_max: 1,
            ..Default::default()
        });
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limiter.check_ip(a).await.is_ok());
        assert!(limiter.check_ip(a).await.is_err());
        assert!(limiter.check_ip(b).await.is_ok());
    }

    #[tokio::test]
    async fn super_admin_gets_higher_ceiling() {
        let limiter = limiter(RateLimitConfig {
            user_max: 2,
            super_admin_user_max: 10,
            ..Default::default()
        });
        let standard = Uuid::new_v4();
        let admin = Uuid::new_v4();

        for _ in 0..2 {
            assert!(limiter.check_principal(standard, false, None).await.is_ok());
        }
        assert!(limiter.check_principal(standard, false, None).await.is_err());

        for _ in 0..10 {
            assert!(limiter.check_principal(admin, true, None).await.is_ok());
        }
        assert!(limiter.check_principal(admin, true, None).await.is_err());
    }

    #[tokio::test]
    async fn organization_scope_caps_combined_users() {
        let limiter = limiter(RateLimitConfig {
            user_max: 100,
            org_max: 3,
            ..Default::default()
        });
        let org = Uuid::new_v4();

        for _ in 0..3 {
            let user = Uuid::new_v4();
            assert!(limiter
                .check_principal(user, false, Some(org))
                .await
                .is_ok());
        }
        let user = Uuid::new_v4();
        assert!(limiter
            .check_principal(user, false, Some(org))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn eviction_drops_expired_entries() {
        let store = Arc::new(InMemoryCounterStore::new());
        store.increment("k", Duration::from_secs(0)).await;
        // Window of zero seconds expires immediately.
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.evict_expired().await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let store = InMemoryCounterStore::new();
        let first = store.increment("k", Duration::from_secs(0)).await;
        assert_eq!(first.count, 1);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = store.increment("k", Duration::from_secs(60)).await;
        assert_eq!(second.count, 1);
    }
}
