//! Udtgate - UDT Gateway Relay Supervisor
//!
//! This is the main entry point for the Udtgate application.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use udtgate::asset::FileAsset;
use udtgate::config::{load_config, RelayRole};
use udtgate::relay::{Client, Server};
use udtgate::supervisor::DebugSink;

/// Udtgate - supervisor for the UDT gateway relay
#[derive(Parser, Debug)]
#[command(name = "udtgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = load_config(&args.config)?;
    config.relay.validate()?;

    info!("Udtgate v{}", udtgate::VERSION);
    info!("Configuration loaded from: {:?}", args.config);
    info!("Gateway peer: {}", config.relay.peer_addr);

    // Setup shutdown signal. The OS interrupt is observed exactly once,
    // here, and fanned out to the role instances main owns; the supervisor
    // itself never registers process-global signal state.
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C and termination signals (cross-platform)
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate())
                .expect("Failed to setup SIGTERM handler");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            // On Windows, only handle Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        }

        let _ = shutdown_tx_clone.send(true);
    });

    let relay = &config.relay;
    let debug_out: Option<DebugSink> = relay
        .log_output
        .then(|| Box::new(tokio::io::stdout()) as DebugSink);

    match relay.role {
        RelayRole::Server => {
            let mut server =
                Server::new(relay.server_config()?).output_policy(relay.output_policy);
            if let Some(path) = &relay.relay_bin {
                server = server.asset_source(Box::new(FileAsset::new(path)));
            }
            if let Some(sink) = debug_out {
                server = server.debug_out(sink);
            }
            info!("Running server role on UDP port {}", relay.listen_port.unwrap_or_default());
            server.run(shutdown_rx).await?;
        }
        RelayRole::Client => {
            let mut client =
                Client::new(relay.client_config()?).output_policy(relay.output_policy);
            if let Some(path) = &relay.relay_bin {
                client = client.asset_source(Box::new(FileAsset::new(path)));
            }
            if let Some(sink) = debug_out {
                client = client.debug_out(sink);
            }

            let mut ready = client.ready();
            let socks_port = relay.socks_port.unwrap_or_default();
            tokio::spawn(async move {
                if ready.changed().await.is_ok() && *ready.borrow() {
                    info!("SOCKS4 endpoint ready on 127.0.0.1:{}", socks_port);
                }
            });

            info!("Running client role, SOCKS4 endpoint on 127.0.0.1:{}", socks_port);
            client.run(shutdown_rx).await?;
        }
    }

    Ok(())
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
