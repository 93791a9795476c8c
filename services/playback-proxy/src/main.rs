//! Spotify Playback Proxy
//!
//! Single-binary Rust service that:
//! 1. Loads Spotify app credentials from config/env
//! 2. Validates the access token before every playback route, refreshing
//!    it through the OAuth refresh grant when it has expired
//! 3. Proxies top-tracks, currently-playing, pause, and play calls to the
//!    Spotify Web API

mod config;
mod error;
mod guard;
mod metrics;
mod routes;
mod spotify;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotify_auth::TokenStore;

use crate::config::Config;
use crate::metrics::ServiceMetrics;
use crate::routes::AppState;
use crate::spotify::SpotifyApi;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting spotify-playback-proxy");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!("no config file, using environment variables only"),
    }

    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    info!(
        port = config.server.port,
        api_url = %config.spotify.api_url,
        token_url = %config.spotify.token_url,
        "configuration loaded"
    );

    let client = reqwest::Client::new();

    let tokens = Arc::new(TokenStore::new(
        client.clone(),
        config.spotify.token_url.clone(),
        config.spotify.client_id.clone(),
        config.spotify.client_secret.clone(),
        config.spotify.refresh_token.clone(),
        config.spotify.access_token.clone(),
    ));

    let app_state = AppState {
        spotify: SpotifyApi::new(
            client,
            &config.spotify.api_url,
            Duration::from_secs(config.spotify.timeout_secs),
        ),
        tokens,
        metrics: ServiceMetrics::new(),
        prometheus: prometheus_handle,
    };

    let app = routes::build_router(app_state, config.server.max_connections);

    let listen_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // Graceful shutdown: stop accepting new connections on SIGTERM/SIGINT
    // and drain in-flight requests before exiting
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        anyhow::bail!("server error: {e}");
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
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
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
