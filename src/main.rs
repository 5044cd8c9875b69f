//! Shortkey - a short-key registry server
//!
//! Serves the registry over HTTP and sweeps expired records in the background.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shortkey::api::{create_router, AppState};
use shortkey::config::Config;
use shortkey::events::{
    AnalyticsListener, EventListener, EventPublisher, EventSink, LoggingListener, MetricsListener,
};
use shortkey::registry::RegistryStore;
use shortkey::service;
use shortkey::tasks::EvictionSweeper;

/// Main entry point for the registry server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Start the event publisher with its listeners
/// 4. Build the store and the configured service stack
/// 5. Start the eviction sweeper
/// 6. Serve HTTP until SIGINT/SIGTERM
/// 7. Stop the sweeper, then drain the event queue
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortkey=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shortkey Registry Server");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: key_length={}, strategy={}, default_expiry={}s, sweep_frequency={}s, port={}",
        config.key_length,
        config.key_strategy,
        config.default_expiry_secs,
        config.sweep_frequency_secs,
        config.server_port
    );

    let metrics = Arc::new(MetricsListener::new());
    let analytics = Arc::new(AnalyticsListener::new());
    let listeners: Vec<Arc<dyn EventListener>> = vec![
        metrics.clone(),
        analytics.clone(),
        Arc::new(LoggingListener::new()),
    ];
    let publisher = Arc::new(EventPublisher::start(listeners, config.event_queue_capacity));
    let sink: Arc<dyn EventSink> = publisher.clone();

    let store = Arc::new(RegistryStore::new());
    let service = service::build(&config, store.clone(), sink.clone())
        .context("Failed to build key service")?;
    if !config.layers.is_empty() {
        let names: Vec<String> = config.layers.iter().map(ToString::to_string).collect();
        info!("Service layers: {}", names.join(" -> "));
    }

    let sweeper = EvictionSweeper::new(store.clone(), sink, config.sweep_frequency())
        .context("Failed to create eviction sweeper")?
        .with_shutdown_grace(config.shutdown_grace());
    sweeper.start();

    let state = AppState::new(service, store, metrics, analytics);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Sweeper first so its final expirations still reach the queue
    sweeper.shutdown().await;
    publisher.shutdown(config.shutdown_grace()).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
