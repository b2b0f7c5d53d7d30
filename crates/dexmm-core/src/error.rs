//! Error types for dexmm-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid market: {0}")]
    InvalidMarket(String),

    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    #[error("Decimal conversion error: {0}")]
    DecimalConversion(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
