//! Error types for quoter-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid top of book: bid {bid} must be below ask {ask}")]
    CrossedBook { bid: String, ask: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
