//! rest-mux server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::endpoint ──▶ routing::trie
//!                     (layers, body)   (root prefix)         (match route)
//!                                                                 │
//!                                                                 ▼
//!     Client Response                                       routing::invoke
//!     ◀────────────── http::response ◀───────────────────── (decode, call,
//!                     (status mapping)                        encode)
//!
//!     Cross-cutting: config, observability (logs, metrics), lifecycle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use rest_mux::config::{resolve_config, ConfigOverrides, EndpointConfig};
use rest_mux::http::tls::load_tls_config;
use rest_mux::lifecycle::{shutdown_signal, Shutdown};
use rest_mux::observability::{logging, metrics};
use rest_mux::services::MapService;
use rest_mux::{ConfigurationError, Endpoint, HttpServer, Route};

#[derive(Parser)]
#[command(name = "rest-mux")]
#[command(about = "REST endpoint with typed, path-routed handlers", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn build_endpoint(config: &EndpointConfig) -> Result<Endpoint, ConfigurationError> {
    let mut builder = Endpoint::builder(&config.root);
    builder
        .add_route(Route::get("/ping", || "pong".to_string())?)?
        .add_service(&Arc::new(MapService::new()))?;
    Ok(builder.build())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        bind_address: cli.bind,
    };
    let config = resolve_config(cli.config.as_deref(), &overrides)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rest-mux starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        root = %config.endpoint.root,
        request_timeout_secs = config.limits.request_timeout_secs,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let endpoint = match build_endpoint(&config.endpoint) {
        Ok(endpoint) => Arc::new(endpoint),
        Err(e) => {
            tracing::error!(error = %e, "Invalid route table");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    match config.listener.tls.clone() {
        Some(tls) => {
            let addr = config.listener.bind_address.parse()?;
            let tls_config = match load_tls_config(&tls).await {
                Ok(tls_config) => tls_config,
                Err(e) => {
                    tracing::error!(cert_path = %tls.cert_path, key_path = %tls.key_path, error = %e, "Failed to load TLS configuration");
                    return Err(e.into());
                }
            };
            HttpServer::new(config, endpoint)
                .run_tls(addr, tls_config, shutdown)
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            HttpServer::new(config, endpoint).run(listener, shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
