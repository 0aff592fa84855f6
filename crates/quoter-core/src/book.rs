//! Top-of-book snapshot.
//!
//! A `TopOfBook` is only constructible in a valid state (both sides positive,
//! bid strictly below ask); deserialization goes through the same check.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::Price;

/// Best bid and best ask for the quoted instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TopOfBookWire")]
pub struct TopOfBook {
    best_bid_price: Price,
    best_ask_price: Price,
}

#[derive(Deserialize)]
struct TopOfBookWire {
    best_bid_price: Price,
    best_ask_price: Price,
}

impl TryFrom<TopOfBookWire> for TopOfBook {
    type Error = CoreError;

    fn try_from(wire: TopOfBookWire) -> Result<Self> {
        Self::new(wire.best_bid_price, wire.best_ask_price)
    }
}

impl TopOfBook {
    /// Create a validated top of book.
    pub fn new(best_bid_price: Price, best_ask_price: Price) -> Result<Self> {
        if !best_bid_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "best bid must be positive, got {best_bid_price}"
            )));
        }
        if !best_ask_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "best ask must be positive, got {best_ask_price}"
            )));
        }
        if best_bid_price >= best_ask_price {
            return Err(CoreError::CrossedBook {
                bid: best_bid_price.to_string(),
                ask: best_ask_price.to_string(),
            });
        }
        Ok(Self {
            best_bid_price,
            best_ask_price,
        })
    }

    #[inline]
    pub fn best_bid(&self) -> Price {
        self.best_bid_price
    }

    #[inline]
    pub fn best_ask(&self) -> Price {
        self.best_ask_price
    }

    /// Unrounded mid price: (bid + ask) / 2.
    pub fn mid(&self) -> Price {
        (self.best_bid_price + self.best_ask_price) / Decimal::TWO
    }

    /// Spread: ask - bid.
    pub fn spread(&self) -> Price {
        self.best_ask_price - self.best_bid_price
    }

    /// True when either side differs from `previous`.
    pub fn moved_from(&self, previous: &TopOfBook) -> bool {
        self.best_bid_price != previous.best_bid_price
            || self.best_ask_price != previous.best_ask_price
    }
}

impl std::fmt::Display for TopOfBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.best_bid_price, self.best_ask_price)
    }
}
