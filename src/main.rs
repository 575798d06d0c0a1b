//! User sync service.
//!
//! Loads configuration, wires the lazily connected user store, the webhook
//! verifier, and the identity provider client into the HTTP server, and runs
//! until a shutdown signal arrives.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tracing::{error, info};
use usersync_api::{AppState, ClerkClient, Config, WebhookVerifier};
use usersync_core::{storage::postgres_store, Clock, ConnectionCache, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    let log_filter =
        config.as_ref().map_or_else(|_| Config::default().rust_log, |c| c.rust_log.clone());
    init_tracing(&log_filter);

    let config = config.inspect_err(|e| {
        error!(error = %format!("{e:#}"), "Configuration invalid, refusing to start");
    })?;

    info!("Starting user sync service");
    info!(
        database_url = %config.database_url_masked(),
        clerk_api_url = %config.clerk_api_url,
        max_connections = config.database_max_connections,
        webhook_tolerance_seconds = config.webhook_tolerance_seconds,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let verifier = WebhookVerifier::new(
        &config.webhook_secret,
        Duration::from_secs(config.webhook_tolerance_seconds),
        clock.clone(),
    )
    .context("WEBHOOK_SECRET is not a valid signing secret")?;

    let provider = ClerkClient::new(config.to_client_config())
        .context("Failed to build identity provider client")?;

    let connections =
        Arc::new(ConnectionCache::new(config.to_connector(), config.database_url.clone()));
    let store = postgres_store(connections.clone());

    let state = AppState::new(store, Arc::new(provider), verifier, clock);
    let addr = config.parse_server_addr()?;

    info!(addr = %addr, "Ready to receive webhooks");
    usersync_api::start_server(state, addr).await.context("HTTP server failed")?;

    if let Some(pool) = connections.current() {
        pool.close().await;
        info!("Database connections closed");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Initializes tracing with the configured filter.
fn init_tracing(filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
