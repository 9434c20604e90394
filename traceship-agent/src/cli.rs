//! CLI argument definitions for traceship-agent.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Traceship log-shipping agent.
///
/// Tails rotating GPU trace log files, checkpoints per-stream cursors,
/// and ships normalized records to the configured publisher backend.
#[derive(Parser, Debug)]
#[command(name = "traceship-agent")]
#[command(version, about, long_about = None)]
pub struct AgentCli {
    /// Path to traceship.toml configuration file.
    #[arg(short, long, default_value = "/etc/traceship/traceship.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the agent.
    #[arg(long)]
    pub validate: bool,
}
