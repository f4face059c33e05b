//! Journal Server Binary
//!
//! Starts the trading journal service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin journal-server
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FEED_API_TOKEN`: Price feed API token
//!
//! ## Optional
//! - `FEED_WS_URL`: Feed WebSocket URL (default: wss://ws.finnhub.io)
//! - `FEED_RECONNECT_DELAY_MS`: Reconnect delay in ms (default: 5000)
//! - `JOURNAL_HTTP_PORT`: HTTP server port (default: 8080)
//! - `JOURNAL_DATA_DIR`: JSON file store directory (default: in-memory)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use journal_server::application::ports::KeyValueStore;
use journal_server::domain::journal::JournalRepository;
use journal_server::infrastructure::telemetry;
use journal_server::{
    ApiServer, AppState, AuthService, HubConfig, InMemoryKeyValueStore, JournalConfig,
    JournalService, JsonFileStore, KvJournalStore, MarketDataHub, PositionMonitor, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    telemetry::init();

    tracing::info!("Starting journal server");

    let _metrics_handle = init_metrics();

    let config = JournalConfig::from_env().context("configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Persistence: JSON files when a data directory is configured,
    // process-memory otherwise.
    let store: Arc<dyn KeyValueStore> = match &config.storage.data_dir {
        Some(dir) => Arc::new(
            JsonFileStore::open(dir.clone())
                .await
                .context("opening data directory")?,
        ),
        None => Arc::new(InMemoryKeyValueStore::new()),
    };
    let repository = Arc::new(KvJournalStore::new(store));

    // Feed hub: constructed once, connected lazily, shared by reference.
    let hub = Arc::new(MarketDataHub::new(
        HubConfig {
            stream_url: config.feed.stream_url.clone(),
            api_token: config.feed.api_token.clone(),
            reconnect_delay: config.feed.reconnect_delay,
        },
        shutdown_token.clone(),
    ));
    Arc::clone(&hub).connect();

    let hub_port: Arc<dyn journal_server::MarketDataPort> = hub.clone();
    let monitor = Arc::new(PositionMonitor::new(hub_port));

    // Re-watch open trades persisted by earlier runs so their prices flow
    // before anyone touches the API.
    let journal = JournalService::new(repository.clone());
    for user in repository.users().await.context("loading users")? {
        for trade in journal
            .open_trades(&user.id)
            .await
            .context("loading open trades")?
        {
            monitor.watch(&trade);
        }
    }
    tracing::info!(watched = monitor.watch_count(), "restored open positions");

    let state = Arc::new(AppState::new(
        AuthService::new(repository.clone()),
        journal,
        Arc::clone(&monitor),
        Arc::clone(&hub),
    ));
    let server = ApiServer::new(config.server.http_port, state, shutdown_token.clone());

    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    tracing::info!("Journal server ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Journal server stopped");
    Ok(())
}

/// Log the parsed configuration. The feed token stays out of the logs.
fn log_config(config: &JournalConfig) {
    tracing::info!(
        feed_url = %config.feed.stream_url,
        reconnect_delay_ms = config.feed.reconnect_delay.as_millis(),
        http_port = config.server.http_port,
        data_dir = ?config.storage.data_dir,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
