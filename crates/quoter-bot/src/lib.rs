//! Quoter host application.
//!
//! Wires the ladder strategy to its collaborators and drives it:
//! - Paper exchange standing in for the order ledger and connectivity
//! - JSON-lines replay feed of market updates
//! - Single event loop serializing updates and ticks
//! - Metrics recorded from strategy outcomes

pub mod app;
pub mod config;
pub mod error;
pub mod paper;
pub mod replay;

pub use app::{Application, RunSummary};
pub use config::{AppConfig, PaperConfig, ReplayConfig};
pub use error::{AppError, AppResult};
pub use paper::PaperExchange;
