//! The stampede client manager.
//!
//! Runs on a load-generation host, connects to the controller, and spawns
//! or kills client processes on command. Stays up across controller
//! restarts; exits only on a terminal handshake rejection or a local
//! shutdown signal.

use anyhow::{Context, Result};
use clap::Parser;
use stampede_config::{load_toml, ManagerConfig, TransportMode};
use stampede_link::ClientManager;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "stampede-manager",
    about = "Stampede client manager: spawns load clients on controller command"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Overrides the configured controller address.
    #[arg(long, value_name = "HOST")]
    controller: Option<String>,

    /// Overrides the configured controller port.
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Overrides the configured client ID.
    #[arg(long, value_name = "ID")]
    client_id: Option<String>,

    /// Overrides the maximum number of client processes.
    #[arg(long, value_name = "COUNT")]
    max_clients: Option<usize>,

    /// Overrides the command used to start one client process.
    #[arg(long, value_name = "COMMAND")]
    start_command: Option<String>,

    /// Connect over TLS.
    #[arg(long)]
    tls: bool,

    /// Accept any server certificate (lab use only).
    #[arg(long)]
    blind_trust: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info")
        }))
        .init();

    let cli = Cli::parse();
    let mut config: ManagerConfig = match &cli.config {
        Some(path) => load_toml(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ManagerConfig::default(),
    };

    if let Some(controller) = cli.controller {
        config.controller_address = controller;
    }
    if let Some(port) = cli.port {
        config.controller_port = port;
    }
    if let Some(client_id) = cli.client_id {
        config.client_id = client_id;
    }
    if let Some(max_clients) = cli.max_clients {
        config.max_clients = max_clients;
    }
    if let Some(start_command) = cli.start_command {
        config.start_command = start_command;
    }
    if cli.tls {
        config.transport = TransportMode::Tls;
    }
    if cli.blind_trust {
        config.accept_any_certificate = true;
    }

    let mut manager = ClientManager::new(config);
    let shutdown = manager.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    manager.run().await.context("client manager failed")?;
    Ok(())
}
