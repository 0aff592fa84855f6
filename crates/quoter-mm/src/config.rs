//! Strategy configuration.
//!
//! Every option the strategy cannot run without is a required serde field,
//! so a missing option fails deserialization with the option's name.
//! Value constraints are checked by [`StrategyConfig::validate`].

use quoter_core::{Price, PriceRounding, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error, fatal at construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} was not found")]
    Missing(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// One rung of the quote ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderLevel {
    /// Offset from the anchor price, in ticks.
    pub level: u32,
    /// Order quantity.
    pub quantity: Size,
}

impl LadderLevel {
    pub fn new(level: u32, quantity: Size) -> Self {
        Self { level, quantity }
    }
}

/// Market making strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Instrument to quote.
    pub instrument_name: String,

    /// Anchor quotes on the tick-rounded mid instead of the raw best bid/ask.
    pub mid_price_based_calculation: bool,

    /// Minimum price increment.
    pub tick_size: Price,

    /// Decimal places quote prices are rounded to.
    pub price_rounding: u32,

    /// Leave pre-existing orders to the connectivity layer's start-up cancel.
    pub cancel_orders_on_start: bool,

    /// Cancel everything and stop permanently on the first escalated failure.
    pub stop_strategy_on_error: bool,

    /// Cancel live orders before every reconnect.
    pub cancel_orders_on_reconnection: bool,

    /// Ask ladder, emitted in this order.
    pub asks: Vec<LadderLevel>,

    /// Bid ladder, emitted in this order.
    pub bids: Vec<LadderLevel>,

    /// Midpoint rounding for quote prices.
    #[serde(default)]
    pub rounding: PriceRounding,

    /// Delay after start (or reconnect) before the first amend.
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,

    /// How long an unacknowledged amend batch may stay pending before
    /// the gateway is considered broken.
    #[serde(default = "default_stale_ceiling_ms")]
    pub stale_ceiling_ms: u64,

    /// Recovery attempts before giving up.
    #[serde(default = "default_max_recovery_attempts")]
    pub max_recovery_attempts: u32,
}

fn default_warmup_ms() -> u64 {
    10_000 // 10 seconds
}
fn default_stale_ceiling_ms() -> u64 {
    5_000 // 5 seconds
}
fn default_max_recovery_attempts() -> u32 {
    5
}

impl StrategyConfig {
    /// Check value constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument_name.trim().is_empty() {
            return Err(ConfigError::Missing("instrument_name"));
        }
        if !self.tick_size.is_positive() {
            return Err(ConfigError::Invalid {
                field: "tick_size",
                reason: format!("must be positive, got {}", self.tick_size),
            });
        }
        if self.asks.is_empty() && self.bids.is_empty() {
            return Err(ConfigError::Invalid {
                field: "asks/bids",
                reason: "at least one ladder level is required".to_string(),
            });
        }
        for (field, ladder) in [("asks", &self.asks), ("bids", &self.bids)] {
            if let Some(bad) = ladder.iter().find(|l| !l.quantity.is_positive()) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("level {} has non-positive quantity {}", bad.level, bad.quantity),
                });
            }
        }
        if self.max_recovery_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_recovery_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Total number of orders one amend cycle produces.
    pub fn ladder_len(&self) -> usize {
        self.asks.len() + self.bids.len()
    }
}
