//! Log subscriber setup for hosts that want this crate's events on stderr.
//!
//! `RUST_LOG` wins over the configured filter when set. [`LogFormat::Off`]
//! installs nothing, leaving the host free to bring its own subscriber.

use std::fmt;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::{SubscriberInitExt as _, TryInitError};

use crate::config::{LogConfig, LogFormat};

/// Subscriber installation failed.
#[derive(Debug)]
pub enum TelemetryError {
    /// The configured filter directive does not parse.
    Filter(tracing_subscriber::filter::ParseError),
    /// A global subscriber is already installed.
    Install(TryInitError),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(e) => write!(
                f,
                "invalid log filter: {e}\n  To fix: set [log] filter to an EnvFilter directive such as \"info\" or \"wesync=debug\"."
            ),
            Self::Install(e) => write!(f, "could not install log subscriber: {e}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filter(e) => Some(e),
            Self::Install(e) => Some(e),
        }
    }
}

/// Install a global subscriber according to `config`.
///
/// # Errors
/// An unparsable filter, or a subscriber that is already installed.
pub fn init(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter = match config.format {
        LogFormat::Off => return Ok(()),
        LogFormat::Compact | LogFormat::Json => build_filter(&config.filter)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Off | LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(TelemetryError::Install)
}

fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .map_err(TelemetryError::Filter)
}
