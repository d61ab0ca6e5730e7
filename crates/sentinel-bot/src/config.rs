//! Application configuration.

use serde::{Deserialize, Serialize};

use sentinel_broker::ExchangeCalendar;
use sentinel_decision::{ClassifierConfig, PriceBands};
use sentinel_executor::ExecutorConfig;
use sentinel_risk::RiskLimits;

use crate::error::{AppError, AppResult};

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Sqlite file path.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/sentinel.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Brokerage API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Open-API base URL.
    pub base_url: String,
    /// Bearer token. Can be overridden by `SENTINEL_BROKER_TOKEN`.
    #[serde(default)]
    pub access_token: String,
}

impl BrokerConfig {
    /// Token with the environment override applied.
    #[must_use]
    pub fn resolved_token(&self) -> String {
        std::env::var("SENTINEL_BROKER_TOKEN").unwrap_or_else(|_| self.access_token.clone())
    }
}

/// Periodic driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Seconds between queue replay passes.
    #[serde(default = "default_queue_interval_secs")]
    pub queue_interval_secs: u64,
    /// Seconds between pending-expiry sweeps.
    #[serde(default = "default_expiry_interval_secs")]
    pub expiry_interval_secs: u64,
}

fn default_queue_interval_secs() -> u64 {
    180
}

fn default_expiry_interval_secs() -> u64 {
    3600
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            queue_interval_secs: default_queue_interval_secs(),
            expiry_interval_secs: default_expiry_interval_secs(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    #[serde(default)]
    pub calendar: ExchangeCalendar,
    #[serde(default)]
    pub risk: RiskLimits,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub bands: PriceBands,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(format!("{path}: {e}")))
    }
}
