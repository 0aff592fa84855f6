//! Core domain types for the quoter market maker.
//!
//! This crate provides the vocabulary shared by the strategy and its host:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `TopOfBook`: Best bid/ask snapshot
//! - `OrderRequest`, `OrderSide`, `OrderId`: Order construction
//! - `MarketUpdate`: Closed set of inbound exchange updates
//! - `Clock`: Time source abstraction

pub mod book;
pub mod clock;
pub mod decimal;
pub mod error;
pub mod order;
pub mod update;

pub use book::TopOfBook;
pub use clock::{Clock, SystemClock};
pub use decimal::{Price, PriceRounding, Size};
pub use error::{CoreError, Result};
pub use order::{OrderId, OrderRequest, OrderSide, OrderType};
pub use update::{FillAck, LiveOrder, MarketUpdate, OrderAck, OrderNack, OrdersSnapshot};
