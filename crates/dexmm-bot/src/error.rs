//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    #[error("Invalid market {market}: {source}")]
    Market {
        market: String,
        #[source]
        source: dexmm_core::CoreError,
    },

    #[error("Invalid market making config for {market}: {source}")]
    MarketMaking {
        market: String,
        #[source]
        source: dexmm_mm::ConfigError,
    },

    #[error("Duplicate bot for market {0}")]
    DuplicateMarket(String),

    #[error("Account error: {0}")]
    Account(#[from] dexmm_account::AccountError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] dexmm_account::CryptoError),

    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dexmm_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
