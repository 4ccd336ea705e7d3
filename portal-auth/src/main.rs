use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use portal_auth::config::AuthConfig;
use portal_auth::services::{EmailProvider, MockEmailService, SmtpEmailService};
use portal_auth::store::InMemoryStore;
use portal_auth::{build_router, AppState};
use portal_core::middleware::rate_limit::InMemoryCounterStore;
use portal_core::observability::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AuthConfig::from_env()?;
    init_tracing(&config.service_name, &config.log_level);

    let email: Arc<dyn EmailProvider> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpEmailService::new(smtp)?),
        None => {
            tracing::warn!("SMTP not configured; outbound email is recorded but not delivered");
            Arc::new(MockEmailService::new())
        }
    };

    let state = AppState::new(
        config.clone(),
        Arc::new(InMemoryStore::new()),
        email,
        Arc::new(InMemoryCounterStore::new()),
    );

    state
        .rate_limiter
        .start_eviction(Duration::from_secs(config.rate_limit_eviction_seconds));

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "portal-auth listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
