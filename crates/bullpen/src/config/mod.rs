use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::recommender::{InvalidPenaltyConfig, PenaltyConfig};

const DEFAULT_HORIZON_BATTERS: u32 = 3;

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
    pub model: ModelConfig,
    pub penalties: PenaltyConfig,
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

        let artifact_path = PathBuf::from(
            env::var("MODEL_PATH").unwrap_or_else(|_| "models/bms.json".to_string()),
        );
        // An unparsable horizon falls back to the default rather than failing startup.
        let horizon_batters = env::var("K_BATTERS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_HORIZON_BATTERS);

        let defaults = PenaltyConfig::default();
        let penalties = PenaltyConfig {
            unavailable_penalty: read_float("BMS_UNAVAILABLE_PENALTY")?
                .unwrap_or(defaults.unavailable_penalty),
            overuse_pitch_threshold: read_pitches("BMS_OVERUSE_PITCHES")?
                .unwrap_or(defaults.overuse_pitch_threshold),
            overuse_penalty: read_float("BMS_OVERUSE_PENALTY")?
                .unwrap_or(defaults.overuse_penalty),
        };
        penalties.validate().map_err(ConfigError::InvalidPenalties)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            model: ModelConfig {
                artifact_path,
                horizon_batters,
            },
            penalties,
        })
    }
}

fn read_float(key: &'static str) -> Result<Option<f64>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(Some)
            .ok_or(ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(None),
    }
}

fn read_pitches(key: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(None),
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

/// Location of the trained scorer artifact and the forecast horizon it was fit for.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
    pub horizon_batters: u32,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidPenalties(InvalidPenaltyConfig),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative number (found '{value}')")
            }
            ConfigError::InvalidPenalties(err) => write!(f, "penalty settings rejected: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPenalties(err) => Some(err),
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "MODEL_PATH",
            "K_BATTERS",
            "BMS_OVERUSE_PITCHES",
            "BMS_OVERUSE_PENALTY",
            "BMS_UNAVAILABLE_PENALTY",
        ] {
            env::remove_var(key);
        }
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
        assert_eq!(config.model.artifact_path, PathBuf::from("models/bms.json"));
        assert_eq!(config.model.horizon_batters, 3);
        assert_eq!(config.penalties, PenaltyConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn unparsable_horizon_falls_back_to_default() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("K_BATTERS", "nine");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.model.horizon_batters, 3);

        env::set_var("K_BATTERS", "6");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.model.horizon_batters, 6);
        reset_env();
    }

    #[test]
    fn penalty_overrides_are_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BMS_OVERUSE_PITCHES", "30");
        env::set_var("BMS_OVERUSE_PENALTY", "0.5");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.penalties.overuse_pitch_threshold, 30);
        assert_eq!(config.penalties.overuse_penalty, 0.5);
        reset_env();
    }

    #[test]
    fn rejects_negative_penalty() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BMS_OVERUSE_PENALTY", "-1");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key, .. }) => {
                assert_eq!(key, "BMS_OVERUSE_PENALTY")
            }
            other => panic!("expected invalid number, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_unavailable_penalty_that_cannot_dominate() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BMS_UNAVAILABLE_PENALTY", "0");
        match AppConfig::load() {
            Err(ConfigError::InvalidPenalties(InvalidPenaltyConfig::UnavailableTooSmall {
                found,
                ..
            })) => assert_eq!(found, 0.0),
            other => panic!("expected rejected penalties, got {other:?}"),
        }

        env::set_var("BMS_UNAVAILABLE_PENALTY", "2500");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.penalties.unavailable_penalty, 2500.0);
        reset_env();
    }
}
