//! Ladder market-making strategy for a single instrument.
//!
//! Decides when and at what prices to requote, and recovers from
//! connectivity or order-state failures:
//! - Quote generation from top of book (raw or mid-price anchored)
//! - Routing of inbound market and order-lifecycle updates
//! - Amend readiness gating with warm-up and staleness ceiling
//! - Bounded-retry recovery with reconnect or stop
//!
//! # Architecture
//!
//! ```text
//! Connectivity ──update──→ StrategyController.on_market_update()
//!                            ├─ TopOfBook: cache, mark dirty
//!                            ├─ Snapshot: reconcile (cancel | activate)
//!                            └─ Acks/Nacks/Fills → OrderLedger
//!
//! Tick ──→ StrategyController.run()
//!            ├─ gate: warm-up, readiness, staleness
//!            ├─ quote_engine: generate ladder
//!            └─ OrderLedger.amend_active_orders()
//!                  ↓ failure
//!            recovery: stop | reset + Connectivity.reconnect() (bounded)
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod quote_engine;
pub mod recovery;
pub mod router;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, LadderLevel, StrategyConfig};
pub use controller::{Phase, StrategyController, StrategyState};
pub use error::{FailureCause, FatalError, StrategyError};
pub use gate::{amend_readiness, Readiness, TickOutcome};
pub use gateway::{
    BoxFuture, Connectivity, ConnectivityError, LedgerError, OrderLedger, UpdateSink,
};
pub use quote_engine::{anchor_prices, generate_orders, Anchors};
pub use recovery::RecoveryOutcome;
pub use router::{Reconciliation, RouteOutcome};
