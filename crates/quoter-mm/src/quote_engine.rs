//! Quote price calculation engine.
//!
//! Computes the full ladder of limit orders from the current top of book:
//! - Raw mode: ladder hangs off the best bid / best ask
//! - Mid mode: ladder hangs off a tick-rounded mid, one tick either side
//!
//! Pure and deterministic; safe to call as often as needed.

use quoter_core::{OrderRequest, OrderSide, Price, TopOfBook};
use rust_decimal::Decimal;

use crate::config::StrategyConfig;

/// Innermost ask and bid prices the ladder is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchors {
    pub ask: Price,
    pub bid: Price,
}

/// Compute the anchor prices for the current book.
pub fn anchor_prices(tob: &TopOfBook, config: &StrategyConfig) -> Anchors {
    if !config.mid_price_based_calculation {
        return Anchors {
            ask: tob.best_ask(),
            bid: tob.best_bid(),
        };
    }

    let tick = config.tick_size;
    let precision = config.price_rounding;
    let rounding = config.rounding;
    let round = |p: Price| p.round_dp(precision, rounding);

    let mid = tob.mid();
    let rounded_mid = round(mid.round_to_tick(tick, rounding));

    if tob.spread() == tick * Decimal::TWO {
        // Two-tick spread: recenter one tick either side of mid
        Anchors {
            ask: round(rounded_mid + tick),
            bid: round(rounded_mid - tick),
        }
    } else if rounded_mid >= mid {
        Anchors {
            ask: rounded_mid,
            bid: round(rounded_mid - tick),
        }
    } else {
        Anchors {
            ask: round(rounded_mid + tick),
            bid: rounded_mid,
        }
    }
}

/// Build the full quote set: every configured ask (config order),
/// then every configured bid (config order).
pub fn generate_orders(tob: &TopOfBook, config: &StrategyConfig) -> Vec<OrderRequest> {
    let anchors = anchor_prices(tob, config);
    let tick = config.tick_size;
    let round = |p: Price| p.round_dp(config.price_rounding, config.rounding);

    let asks = config.asks.iter().map(|quote| {
        let offset = tick * Decimal::from(quote.level);
        OrderRequest::limit(
            config.instrument_name.as_str(),
            OrderSide::Sell,
            round(anchors.ask + offset),
            quote.quantity,
        )
    });
    let bids = config.bids.iter().map(|quote| {
        let offset = tick * Decimal::from(quote.level);
        OrderRequest::limit(
            config.instrument_name.as_str(),
            OrderSide::Buy,
            round(anchors.bid - offset),
            quote.quantity,
        )
    });

    asks.chain(bids).collect()
}
