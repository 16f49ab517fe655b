//! Server configuration.
//!
//! Settings come from CLI flags with environment-variable fallbacks
//! (`ARCLIGHT_*`); flags win when both are present.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use snafu::Snafu;

/// Command-line and environment configuration for the Arclight node.
#[derive(Debug, Clone, Parser)]
#[command(name = "arclight", about = "JSON-RPC query node for the Arclight ledger network")]
pub struct Config {
    /// Address to listen on for JSON-RPC over HTTP.
    #[arg(long, env = "ARCLIGHT_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Data directory for the ledger database.
    #[arg(long, env = "ARCLIGHT_DATA")]
    pub data: PathBuf,

    /// Number of most-recent ledgers to retain on disk.
    #[arg(long, env = "ARCLIGHT_RETENTION_WINDOW", default_value_t = 17_280)]
    pub retention_window: u32,

    /// Address to expose Prometheus metrics. Disabled when unset.
    #[arg(long, env = "ARCLIGHT_METRICS")]
    pub metrics: Option<SocketAddr>,

    /// Log output format.
    #[arg(long, env = "ARCLIGHT_LOG_FORMAT", value_enum, default_value = "auto")]
    pub log_format: LogFormat,
}

/// Log output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable format (development).
    Text,
    /// JSON structured logging (production).
    Json,
    /// JSON for non-TTY stdout, text otherwise.
    Auto,
}

/// Configuration validation error.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// The retention window must keep at least one ledger.
    #[snafu(display("retention window must be at least 1, got {value}"))]
    InvalidRetentionWindow {
        /// The configured value.
        value: u32,
    },
}

impl Config {
    /// Validates settings the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        snafu::ensure!(
            self.retention_window >= 1,
            InvalidRetentionWindowSnafu { value: self.retention_window }
        );
        Ok(())
    }

    /// Path of the database file inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data.join("arclight.redb")
    }
}
