//! Logging setup for docqa binaries.
//!
//! Installs a global `tracing` subscriber with an [`EnvFilter`] and either a
//! human-readable or a JSON formatting layer. Library crates only emit events;
//! binaries call [`init_telemetry`] once at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_telemetry::{TelemetryConfig, LogFormat, init_telemetry};
//!
//! init_telemetry(TelemetryConfig::default().with_format(LogFormat::Json))?;
//! tracing::info!(collection = "docs", "ready");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("telemetry already initialized")]
    AlreadyInitialized,

    /// The filter directive could not be parsed.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    /// The log format name is not recognised.
    #[error("unknown log format '{0}', expected 'pretty' or 'json'")]
    UnknownFormat(String),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines for a terminal.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Explicit filter directive. `None` reads `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
    pub filter: Option<String>,
    /// Output format.
    pub format: LogFormat,
}

impl TelemetryConfig {
    /// Use an explicit filter directive instead of `RUST_LOG`.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        match &self.filter {
            Some(directive) => EnvFilter::try_new(directive).map_err(|e| {
                TelemetryError::InvalidFilter { filter: directive.clone(), message: e.to_string() }
            }),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// The subscriber becomes the global `tracing` dispatcher. Logs go to stderr
/// so command output on stdout stays clean.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a subscriber is already
/// installed, or [`TelemetryError::InvalidFilter`] for a malformed directive.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    let directive = filter.to_string();
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(fmt_layer::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt_layer::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
    };

    installed.map_err(|_| TelemetryError::AlreadyInitialized)?;
    tracing::debug!(filter = %directive, format = %config.format, "telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!("xml".parse::<LogFormat>(), Err(TelemetryError::UnknownFormat(f)) if f == "xml"));
    }

    #[test]
    fn config_serializes_format_in_lowercase() {
        let config = TelemetryConfig::default().with_format(LogFormat::Json);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["format"], "json");
    }

    #[test]
    fn malformed_filter_is_rejected_before_install() {
        let config = TelemetryConfig::default().with_filter("docqa=notalevel");
        assert!(matches!(init_telemetry(config), Err(TelemetryError::InvalidFilter { .. })));
    }

    #[test]
    fn second_initialization_is_reported() {
        let config = TelemetryConfig::default().with_filter("warn");
        // The first call may race with other tests in this binary; the second never succeeds.
        let _ = init_telemetry(config.clone());
        assert!(matches!(init_telemetry(config), Err(TelemetryError::AlreadyInitialized)));
    }
}
