//! dbproxy-daemon entry point.
//!
//! Intentionally thin: load config, wire shared state, start the health
//! loop, serve HTTP. Route handlers live in `routes.rs`; shared state types
//! live in `state.rs`; startup wiring lives in `wiring.rs`.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use dbproxy_config::ProxyConfig;
use dbproxy_daemon::{routes, wiring};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config_path = config_path_from_env();
    let config = ProxyConfig::load(&[config_path.as_path()])
        .with_context(|| format!("load config from {}", config_path.display()))?;
    info!(
        databases = config.databases.len(),
        strategy = %config.strategy,
        config_hash = %config.config_hash,
        "config loaded"
    );

    let (state, monitor) = wiring::build(&config).await?;

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    monitor.spawn_loop(Duration::from_secs(config.health.interval_seconds), shutdown_rx);

    let app = routes::build_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));
    info!("dbproxy-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("DBPROXY_ADDR").ok()?.parse().ok()
}

fn config_path_from_env() -> PathBuf {
    std::env::var("DBPROXY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("dbproxy.yaml"))
}

fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
