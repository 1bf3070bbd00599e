//! trickle-faucet: HTTP service in front of the distribution engine.
//!
//! Serves a web UI at `/`, a health check at `/health`, and a REST API under
//! `/api` for claims, eligibility queries and administration. Requests use
//! wall-clock time; state is persisted to a JSON file after every change.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

mod config;
mod deploy;
mod routes;

use config::Config;
use deploy::Deployment;
use trickle_core::constants::format_tokens;
use trickle_core::EventLog;

/// Shared application state passed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Engine and token ledger.
    pub deployment: Arc<Deployment>,
    /// Recent engine events for `/api/events`.
    pub events: Arc<EventLog>,
    /// Faucet configuration.
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(deployment: Deployment, config: Config) -> Self {
        let events = Arc::new(EventLog::default());
        deployment.engine.subscribe(events.clone());
        Self {
            deployment: Arc::new(deployment),
            events,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load faucet configuration")?;

    info!(
        bind = %config.bind_addr,
        admin = %config.admin_address,
        state = %config.state_path.display(),
        amount_tokens = %format_tokens(config.claim_amount),
        cooldown_secs = config.cooldown_secs,
        max_claims = config.max_claims,
        "Starting trickle-faucet"
    );

    let deployment = Deployment::load_or_deploy(&config)?;
    info!(
        engine = %deployment.engine.address(),
        ledger = ?deployment.engine.ledger_address(),
        paused = deployment.engine.is_paused(),
        "Faucet ready"
    );

    let state = AppState::new(deployment, config.clone());
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
