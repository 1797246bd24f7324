use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use waitingroom_core::Cache;
use waitingroom_crypto::CookieCodec;
use waitingroom_gateway::{AccessController, QueueHandler};
use waitingroom_server::api::AppState;
use waitingroom_server::config::WaitingRoomConfig;

/// Virtual waiting room gateway HTTP server.
#[derive(Parser, Debug)]
#[command(name = "waitingroom-server", about = "Standalone HTTP server for the waiting room gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "waitingroom.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config: WaitingRoomConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };

    waitingroom_server::telemetry::init(config.logging.filter.as_deref());

    let queue_config = config.queue.to_queue_config();

    let store = waitingroom_server::state_factory::create_state(&config.store).await?;
    info!(backend = %config.store.backend, "state store initialized");

    let cookie_codec = CookieCodec::from_env();
    let client_codec = Arc::new(waitingroom_core::client::ClientCodec::new(cookie_codec));

    let cache = Arc::new(Cache::new());

    let whitelist = waitingroom_gateway::Whitelist::new(store.clone(), cache.clone(), queue_config.clone());
    for domain in &config.whitelist.domains {
        whitelist.add(domain).await?;
    }
    info!(count = config.whitelist.domains.len(), "seeded configured whitelist domains");

    let queue_handler = Arc::new(QueueHandler::new(
        store.clone(),
        cache.clone(),
        queue_config.clone(),
        client_codec,
    ));

    let access_controller = Arc::new(AccessController::new(store.clone(), cache.clone(), queue_config.clone()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let controller_handle = tokio::spawn(access_controller.run(shutdown_rx));

    let state = AppState {
        queue_handler,
        store: store.clone(),
        queue_config,
    };
    let app = waitingroom_server::api::router(state);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "waitingroom-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let _ = shutdown_tx.send(()).await;
    if tokio::time::timeout(shutdown_timeout, controller_handle)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            "access controller did not shut down within the grace period"
        );
    }

    info!("waitingroom-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
