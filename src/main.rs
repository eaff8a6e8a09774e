//! Multipart upload gateway.
//!
//! Accepts `multipart/form-data` uploads on public routes, rebuilds each
//! body with a fresh boundary, forwards it to the downstream processing
//! service and relays the downstream response unchanged.
//!
//! ```text
//!     Client Request           ┌──────────────────────────────────────────────────┐
//!     ─────────────────────────┼─▶ http server ─▶ decoder ─▶ encoder ─▶ dispatcher ─┼──▶ Downstream
//!                              │   (CORS, id)    (parse     (fresh      (POST,     │    Service
//!     Client Response          │                  once)      boundary)   timeout)  │
//!     ◀────────────────────────┼──────────────────────── relay ◀───────────────────┼───
//!                              └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use upload_gateway::config::loader::{apply_env_overrides, load_config};
use upload_gateway::observability::{logging, metrics};
use upload_gateway::{GatewayConfig, HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "upload-gateway")]
#[command(about = "Forwards multipart uploads to a downstream processing service", long_about = None)]
struct Args {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    let config = apply_env_overrides(config)?;

    logging::init_logging(&config.observability)?;
    tracing::info!("upload-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        downstream = %config.downstream.base_url,
        timeout_secs = config.downstream.timeout_secs,
        routes = config.routes.len(),
        config_file = ?args.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
