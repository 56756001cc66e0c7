use crate::engine::batch::ErrorPolicy;
use crate::engine::risk::{DayCurve, RiskThresholds};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut engine = EngineConfig::default();
        if let Ok(policy) = env::var("RECOVERY_ERROR_POLICY") {
            engine.error_policy = match policy.trim().to_ascii_lowercase().as_str() {
                "abort" | "abort_on_error" => ErrorPolicy::AbortOnError,
                "skip" | "skip_and_report" => ErrorPolicy::SkipAndReport,
                other => {
                    return Err(ConfigError::InvalidErrorPolicy {
                        value: other.to_string(),
                    })
                }
            };
        }
        if let Ok(workers) = env::var("RECOVERY_WORKERS") {
            engine.workers = workers
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidWorkerCount)?;
        }
        if let Ok(limit) = env::var("RECOVERY_MAX_BATCH_ROWS") {
            engine.max_batch_rows = limit
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidBatchLimit)?;
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tunables for the prediction pipeline. The thresholds and curves are
/// deliberate configuration, not hardcoded law: deployments may move the
/// risk bands or the day curve without touching engine code.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub risk_thresholds: RiskThresholds,
    pub day_curve: DayCurve,
    /// How many attribution factors survive truncation in each result.
    pub top_factors: usize,
    /// Impacts within this band of zero are tagged neutral rather than
    /// directional, so noise never reads as signal.
    pub direction_epsilon: f64,
    pub error_policy: ErrorPolicy,
    /// Upper bound on concurrent scoring workers per batch.
    pub workers: usize,
    /// Best-effort cap on rows accepted per upload to bound memory.
    pub max_batch_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_thresholds: RiskThresholds::default(),
            day_curve: DayCurve::default(),
            top_factors: 5,
            direction_epsilon: 0.01,
            error_policy: ErrorPolicy::SkipAndReport,
            workers: 8,
            max_batch_rows: 10_000,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidErrorPolicy { value: String },
    InvalidWorkerCount,
    InvalidBatchLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidErrorPolicy { value } => {
                write!(
                    f,
                    "RECOVERY_ERROR_POLICY must be 'skip' or 'abort', got '{value}'"
                )
            }
            ConfigError::InvalidWorkerCount => {
                write!(f, "RECOVERY_WORKERS must be a positive integer")
            }
            ConfigError::InvalidBatchLimit => {
                write!(f, "RECOVERY_MAX_BATCH_ROWS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RECOVERY_ERROR_POLICY");
        env::remove_var("RECOVERY_WORKERS");
        env::remove_var("RECOVERY_MAX_BATCH_ROWS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.engine.error_policy, ErrorPolicy::SkipAndReport);
        assert_eq!(config.engine.top_factors, 5);
    }

    #[test]
    fn load_accepts_abort_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RECOVERY_ERROR_POLICY", "abort");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.engine.error_policy, ErrorPolicy::AbortOnError);
    }

    #[test]
    fn load_rejects_unknown_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RECOVERY_ERROR_POLICY", "retry");
        let error = AppConfig::load().expect_err("unknown policy rejected");
        assert!(matches!(error, ConfigError::InvalidErrorPolicy { .. }));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }
}
