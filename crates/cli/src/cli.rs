//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Mail Relay - at-most-once email dispatch with retry, fallback and rate limiting
#[derive(Parser, Debug)]
#[command(
    name = "mail-relay",
    author,
    version,
    about = "At-most-once email dispatch with retry, fallback and rate limiting",
    long_about = "Dispatches email requests through an ordered list of delivery providers.\n\n\
                  Each request id is delivered at most once; failed attempts are retried \n\
                  with exponential backoff before falling back to the next provider, and \n\
                  a global fixed-window rate limit gates admission."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MAIL_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MAIL_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch a single email request
    Send(SendArgs),

    /// Dispatch a batch of generated requests concurrently and report statistics
    Simulate(SimulateArgs),

    /// Validate configuration file without dispatching
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Configuration source plus per-field overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "MAIL_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override rate limit capacity (requests per window)
    #[arg(long, env = "MAIL_RELAY_CAPACITY")]
    pub capacity: Option<u32>,

    /// Override rate limit window in milliseconds
    #[arg(long, env = "MAIL_RELAY_WINDOW_MS")]
    pub window_ms: Option<u64>,

    /// Override attempts per provider
    #[arg(long, env = "MAIL_RELAY_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Override backoff base delay in milliseconds
    #[arg(long, env = "MAIL_RELAY_BASE_DELAY_MS")]
    pub base_delay_ms: Option<u64>,
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Idempotency key of the request
    #[arg(long)]
    pub id: String,

    /// Recipient address
    #[arg(long, default_value = "user@example.com")]
    pub to: String,

    /// Subject line
    #[arg(long, default_value = "Hello")]
    pub subject: String,

    /// Message body
    #[arg(long, default_value = "")]
    pub body: String,

    /// Send the same request this many times (shows idempotent replay)
    #[arg(long, default_value = "1")]
    pub repeat: u32,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MAIL_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Number of requests to dispatch
    #[arg(short = 'n', long, default_value = "20")]
    pub requests: usize,

    /// Share of requests that reuse an earlier request id (0.0 - 1.0)
    #[arg(long, default_value = "0.2")]
    pub duplicate_ratio: f64,

    /// Maximum in-flight dispatches
    #[arg(long, default_value = "8")]
    pub concurrency: usize,

    /// Simulation timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "MAIL_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MAIL_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "mail-relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
