//! Application configuration.
//!
//! Loaded with the `config` crate from a TOML file, then layered with
//! `QUOTER__*` environment overrides (`QUOTER__TICK_INTERVAL_MS=100`,
//! `QUOTER__STRATEGY__STOP_STRATEGY_ON_ERROR=true`).

use crate::error::{AppError, AppResult};
use config::{Config, Environment, File, FileFormat};
use quoter_mm::StrategyConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "QUOTER";

/// Paper exchange behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Acknowledge new orders and amends immediately.
    /// With `false` batches never settle and the staleness ceiling trips.
    #[serde(default = "default_auto_ack")]
    pub auto_ack: bool,
    /// Number of reconnects to fail before succeeding.
    #[serde(default)]
    pub reconnect_failures: u32,
}

fn default_auto_ack() -> bool {
    true
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            auto_ack: default_auto_ack(),
            reconnect_failures: 0,
        }
    }
}

/// Replay feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// JSON-lines file of market updates. Overridden by `--replay`.
    #[serde(default)]
    pub path: Option<String>,
    /// Delay between replayed lines.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
}

fn default_pace_ms() -> u64 {
    100
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            path: None,
            pace_ms: default_pace_ms(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    /// Period of the strategy tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

fn default_tick_interval_ms() -> u64 {
    200
}

fn env_overrides() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load configuration from a TOML file with environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        Self::load(File::new(path, FileFormat::Toml), env_overrides())
    }

    /// Parse configuration from TOML text with environment overrides.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        Self::load(File::from_str(content, FileFormat::Toml), env_overrides())
    }

    fn load<S>(file: S, env: Environment) -> AppResult<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Self = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        self.strategy.validate()?;
        if self.tick_interval_ms == 0 {
            return Err(AppError::Config(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
