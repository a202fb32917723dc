//! Logging configuration.
//!
//! The crate logs through `tracing` with structured fields; this module
//! wires up the subscriber for binaries and tests that embed the queue.
//! Libraries embedding `raftlease` that already install a subscriber can
//! skip it entirely.
//!
//! ```rust,no_run
//! use raftlease::telemetry::{LogFormat, init_logging};
//!
//! init_logging(LogFormat::from_env()).expect("init logging");
//! ```
//!
//! # Environment variables
//!
//! - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `RUST_LOG`: level filter (default: `info`); set
//!   `RUST_LOG=raftlease=trace` to see the per-command trace lines the
//!   mediator emits.

use tracing_subscriber::prelude::*;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty-print format (default).
    #[default]
    Pretty,
    /// JSON format for log aggregators.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        })
    }
}

impl LogFormat {
    /// Read from the `LOG_FORMAT` environment variable.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|s| s.parse().unwrap_or_default())
            .unwrap_or_default()
    }
}

/// Initialize the tracing subscriber with the given format.
///
/// Log levels are controlled via `RUST_LOG`. Fails if a global subscriber is
/// already installed.
///
/// Note: true JSON output needs the `json` feature on `tracing-subscriber`;
/// without it the JSON format falls back to pretty with a warning.
pub fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    if format == LogFormat::Json {
        tracing::warn!("JSON logging requested but json feature not enabled, using pretty format");
    }

    Ok(())
}
