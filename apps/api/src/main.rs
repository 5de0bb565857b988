//! # Saledesk API Server
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Server Startup                                    │
//! │                                                                         │
//! │  1. Initialize Logging        RUST_LOG, default info,saledesk=debug     │
//! │  2. Load Configuration        defaults → saledesk.toml → SALEDESK_*     │
//! │  3. Connect to Database       SQLite (WAL), run pending migrations      │
//! │  4. Start Outbox Relay        unless events.publisher = "none"          │
//! │  5. Serve HTTP                until Ctrl+C / SIGTERM                    │
//! │  6. Stop relay, close pool                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use saledesk_api::{build_router, ApiConfig, AppState};
use saledesk_db::{Database, DbConfig};
use saledesk_events::OutboxRelay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Saledesk API server...");

    let config_path = std::env::var_os("SALEDESK_CONFIG").map(PathBuf::from);
    let config = ApiConfig::load(config_path).context("Failed to load configuration")?;

    let db_path = config.database_path()?;
    info!(?db_path, publisher = %config.events.publisher, "Configuration loaded");

    let db = Database::new(
        DbConfig::new(&db_path).max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to open database")?;
    info!(path = %db_path.display(), "Sales store ready");

    let relay = match config.events.build_publisher()? {
        Some(publisher) => {
            let (relay, handle) =
                OutboxRelay::new(db.clone(), publisher, config.events.relay_settings());
            let task = tokio::spawn(relay.run());
            Some((handle, task))
        }
        None => {
            warn!("Event publisher disabled; events will stay in the outbox");
            None
        }
    };

    let state = AppState::new(db.clone(), relay.as_ref().map(|(handle, _)| handle.clone()));
    let app = build_router(state);

    let listener = TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((handle, task)) = relay {
        if let Err(e) = handle.shutdown().await {
            warn!(?e, "Relay already stopped");
        }
        if let Err(e) = task.await {
            error!(?e, "Relay task failed");
        }
    }

    db.close().await;
    info!("Saledesk API stopped");
    Ok(())
}

/// Installs the global `fmt` subscriber. `RUST_LOG` wins over the built-in filter.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=saledesk=trace` - Show trace for saledesk crates only
/// - Default: `info,saledesk=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,saledesk=debug,sqlx=warn,tower_http=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown requested, draining connections");
}
