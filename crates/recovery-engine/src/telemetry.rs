//! Tracing setup for the recovery service. Development gets a human-oriented
//! layout; test and production emit compact, ansi-free lines for collectors.

use crate::config::{AppEnvironment, TelemetryConfig};
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{value}'")]
    Filter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

fn parse_filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::Filter {
        value: directives.to_string(),
        source,
    })
}

/// `RUST_LOG` wins when set; otherwise the configured level applies to the
/// whole process.
fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(&config.log_level),
    }
}

pub fn init(environment: AppEnvironment, config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match environment {
        AppEnvironment::Development => builder
            .with_target(true)
            .try_init()
            .map_err(TelemetryError::AlreadyInstalled),
        AppEnvironment::Test | AppEnvironment::Production => builder
            .with_target(false)
            .compact()
            .with_ansi(false)
            .try_init()
            .map_err(TelemetryError::AlreadyInstalled),
    }
}
