//! peerwave discovery daemon.
//!
//! Advertises this device on the local network and logs peer
//! availability changes as they happen.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use peerwave::{DiscoveryConfig, DiscoveryEvent, WifiDiscovery};

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Console filter respects RUST_LOG, with the CLI flag as fallback
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => DiscoveryConfig::default(),
    };

    // Apply command-line overrides
    if let Some(location) = &cli.location {
        config.location = location.clone();
    }
    if let Some(group_addr) = &cli.group_addr {
        config.group_addr = group_addr.clone();
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_daemon(cli, config))
}

async fn run_daemon(cli: Cli, config: DiscoveryConfig) -> Result<()> {
    let (discovery, mut events) = WifiDiscovery::new(&cli.device_name, config);

    discovery.start_listening().await?;
    if !cli.listen_only {
        discovery.start_advertising().await?;
        tracing::info!(
            device_name = %cli.device_name,
            usn = %discovery.current_usn(),
            "Advertising on the local network"
        );
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(DiscoveryEvent::PeerAvailabilityChanged(changes)) => {
                        for change in changes {
                            if change.peer_available {
                                tracing::info!(location = %change.peer_location, "Peer available");
                            } else {
                                tracing::info!(location = %change.peer_location, "Peer unavailable");
                            }
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    discovery.stop_advertising().await?;
    discovery.stop_listening().await?;

    Ok(())
}
