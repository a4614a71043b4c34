//! Shared configuration for the croupier control surface.
//!
//! The configuration covers the control socket endpoint, telemetry output,
//! and the deferred-completion budget. Values resolve from built-in defaults
//! overridden by `CROUPIER_*` environment variables; an unparseable override
//! fails loading rather than being silently ignored.

pub mod defaults;
mod logging;
mod socket;

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved configuration for the control server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Endpoint the control socket binds to.
    pub socket: SocketEndpoint,
    /// Tracing filter expression, e.g. `info` or `croupierd=debug`.
    pub log_filter: String,
    /// Telemetry output format.
    pub log_format: LogFormat,
    /// Tick budget for deferred completions; zero disables the timeout.
    pub settle_budget: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: defaults::socket_endpoint(),
            log_filter: defaults::DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            settle_budget: defaults::DEFAULT_SETTLE_BUDGET,
        }
    }
}

impl Config {
    /// Loads the configuration from defaults and `CROUPIER_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override variable is set but cannot be
    /// parsed. Loading never partially applies: the first bad variable wins.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = read_var("CROUPIER_SOCKET") {
            config.socket = parse_var("CROUPIER_SOCKET", &raw)?;
        }
        if let Some(raw) = read_var("CROUPIER_LOG_FILTER") {
            config.log_filter = raw;
        }
        if let Some(raw) = read_var("CROUPIER_LOG_FORMAT") {
            config.log_format = parse_var("CROUPIER_LOG_FORMAT", &raw)?;
        }
        if let Some(raw) = read_var("CROUPIER_SETTLE_BUDGET") {
            config.settle_budget = parse_var("CROUPIER_SETTLE_BUDGET", &raw)?;
        }
        Ok(config)
    }

    /// Accessor for the configured socket endpoint.
    #[must_use]
    pub fn socket(&self) -> &SocketEndpoint {
        &self.socket
    }

    /// Accessor for the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Accessor for the telemetry output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Completion budget as an optional deadline; zero maps to `None`.
    #[must_use]
    pub fn settle_budget(&self) -> Option<u64> {
        (self.settle_budget > 0).then_some(self.settle_budget)
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|error: T::Err| ConfigError {
        variable: name,
        value: raw.to_owned(),
        message: error.to_string(),
    })
}

/// Error raised when an environment override fails to parse.
#[derive(Debug, Error)]
#[error("invalid {variable}='{value}': {message}")]
pub struct ConfigError {
    /// Name of the offending environment variable.
    pub variable: &'static str,
    /// The raw value that failed to parse.
    pub value: String,
    /// Human-readable parse failure.
    pub message: String,
}
