//! nirmaand - Nirmaan Stack project chat and procurement API server.

mod chat;
mod config;
mod db;
mod doctype;
mod error;
mod handlers;
mod http;
mod metrics;
mod procurement;
mod realtime;
mod security;
mod state;
mod telemetry;

use crate::config::Config;
use crate::db::Database;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {config_path}",
            errors.len()
        ));
    }

    info!(server = %config.server.name, listen = %config.server.listen, "Starting nirmaand");

    metrics::init();

    // Initialize database and apply configured roles, users and projects
    let db = Database::new(&config.database.path).await?;
    config::seed::apply(&db, &config).await?;

    let state = AppState::new(db, &config);

    // Drop idle realtime rooms and stale typing limiters
    {
        let hub = Arc::clone(&state.hub);
        let chat = Arc::clone(&state.chat);
        let period = Duration::from_secs(config.realtime.prune_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = hub.prune_idle();
                if removed > 0 {
                    info!(target: "realtime", removed, rooms = hub.room_count(), "Idle rooms pruned");
                }
                chat.typing_limiter().cleanup();
            }
        });
    }

    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    match config.server.metrics_port {
        Some(0) | None => info!("Metrics endpoint disabled"),
        Some(port) => {
            tokio::spawn(http::run_metrics_server(port));
        }
    }

    http::run_api_server(config.server.listen, handlers::router(state)).await?;

    info!("nirmaand stopped");
    Ok(())
}
