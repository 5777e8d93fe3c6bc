//! CLI definitions for the peerwave daemon.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Local-network WiFi peer discovery daemon
#[derive(Parser)]
#[command(name = "peerwave")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Device name advertised to peers
    #[arg(short = 'n', long)]
    pub device_name: String,

    /// URI peers should connect back to (overrides config)
    #[arg(short = 'l', long)]
    pub location: Option<String>,

    /// Multicast group address (overrides config)
    #[arg(short = 'g', long)]
    pub group_addr: Option<String>,

    /// Path to JSON configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Only listen for peers; do not advertise
    #[arg(long)]
    pub listen_only: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, short = 'L', default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}
