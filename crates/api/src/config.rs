//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use engine::{EngineConfig, RestockPolicy, config::DEFAULT_HOLD_MINUTES};

/// Log output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `4000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `ORDER_HOLD_MINUTES`: minutes before an unconfirmed order expires (default: `15`)
/// - `SWEEP_INTERVAL_SECS`: seconds between expiry sweeps (default: `60`)
/// - `CANCEL_RESTOCK_POLICY`: `unconditional` or `before_preparation`
/// - `MENU_SEED_PATH`: JSON file of menu items loaded at startup
///
/// A value that cannot be parsed falls back to its default and is recorded
/// in `warnings`, which `main` logs once tracing is up.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub order_hold_minutes: i64,
    pub sweep_interval: Duration,
    pub restock_policy: RestockPolicy,
    pub menu_seed_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut warnings = Vec::new();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut parsed = |key: &str, default: u64, min: u64| -> u64 {
            match var(key) {
                None => default,
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(value) if value >= min => value,
                    _ => {
                        warnings.push(format!("{key}={raw:?} is invalid, using {default}"));
                        default
                    }
                },
            }
        };

        let port = parsed("PORT", u64::from(defaults.port), 1).min(u64::from(u16::MAX)) as u16;
        let database_max_connections =
            parsed("DATABASE_MAX_CONNECTIONS", u64::from(defaults.database_max_connections), 1)
                .min(u64::from(u32::MAX)) as u32;
        let order_hold_minutes = parsed("ORDER_HOLD_MINUTES", DEFAULT_HOLD_MINUTES as u64, 1)
            .min(i64::MAX as u64) as i64;
        let sweep_interval =
            Duration::from_secs(parsed("SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs(), 1));

        let log_format = match var("LOG_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::Pretty,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(v) if v == "json" => LogFormat::Json,
            Some(other) => {
                warnings.push(format!("LOG_FORMAT={other:?} is invalid, using pretty"));
                LogFormat::Pretty
            }
        };

        let restock_policy = match var("CANCEL_RESTOCK_POLICY") {
            None => RestockPolicy::default(),
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warnings.push(format!("{e}, using {}", RestockPolicy::default()));
                RestockPolicy::default()
            }),
        };

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: var("DATABASE_URL"),
            database_max_connections,
            order_hold_minutes,
            sweep_interval,
            restock_policy,
            menu_seed_path: var("MENU_SEED_PATH").map(PathBuf::from),
            warnings,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_hold(chrono::Duration::minutes(self.order_hold_minutes))
            .with_restock_policy(self.restock_policy)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 10,
            order_hold_minutes: DEFAULT_HOLD_MINUTES,
            sweep_interval: Duration::from_secs(60),
            restock_policy: RestockPolicy::Unconditional,
            menu_seed_path: None,
            warnings: Vec::new(),
        }
    }
}
