//! Prism node — entry point.
//!
//! Starts the visibility and verification engine with configuration from a
//! TOML file or defaults.

mod api;
mod auth;
mod config;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use config::PrismConfig;
use state::AppState;

/// Prism visibility and verification node
#[derive(Parser, Debug)]
#[command(name = "prism-node", version, about = "Prism visibility and verification node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "prism.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Handle --init flag before touching the subscriber format choice.
    if args.init {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        let config = PrismConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    let mut config = PrismConfig::load(&args.config)?;
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    config.logging.level = args.log_level;

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    tracing::info!("Prism node v{}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(AppState::bootstrap(&config));
    let listen_addr: SocketAddr = config.api_addr().parse()?;

    api::start_api_server(listen_addr, state).await?;
    tracing::info!("Prism node exited cleanly");
    Ok(())
}
