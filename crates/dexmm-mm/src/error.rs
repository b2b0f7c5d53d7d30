//! Error types for dexmm-mm.

use dexmm_core::PreOrderProblems;
use thiserror::Error;

use crate::config::GapStrategy;

/// Errors reported by the trading engine adaptor.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Not connected to {0}")]
    NotConnected(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("{0}")]
    Other(String),
}

/// Market making configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("drift tolerance {0} out of bounds [0, 0.01]")]
    DriftTolerance(f64),

    #[error("invalid {side} placement: {strategy} gap factor {gap_factor} is out of bounds [{min}, {max}]")]
    GapFactorOutOfBounds {
        side: &'static str,
        strategy: GapStrategy,
        gap_factor: f64,
        min: f64,
        max: f64,
    },

    #[error("duplicate {side} placement {gap_factor}")]
    DuplicatePlacement { side: &'static str, gap_factor: f64 },
}

/// Per-epoch pricing errors. Recoverable: the bot skips the epoch.
#[derive(Debug, Clone, Error)]
pub enum CalcError {
    #[error("no oracle or fiat rate available")]
    NoBasisPrice,

    #[error("oracle rate and fiat rate mismatch: oracle {oracle}, fiat {fiat}")]
    OracleFiatMismatch { oracle: u64, fiat: u64 },

    #[error("basis price cannot be zero")]
    ZeroBasisPrice,

    #[error("error getting {side} fees in base units: {source}")]
    Fees {
        side: &'static str,
        #[source]
        source: EngineError,
    },
}

impl CalcError {
    /// Classify for the epoch report.
    pub fn pre_order_problems(&self) -> PreOrderProblems {
        match self {
            CalcError::NoBasisPrice => PreOrderProblems {
                no_price_source: true,
                ..Default::default()
            },
            CalcError::OracleFiatMismatch { .. } => PreOrderProblems {
                oracle_fiat_mismatch: true,
                ..Default::default()
            },
            other => PreOrderProblems::unknown(other.to_string()),
        }
    }
}

/// Bot lifecycle errors.
#[derive(Debug, Error)]
pub enum MmError {
    #[error("invalid market making config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to parse market making config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to sync book: {0}")]
    SyncBook(#[source] EngineError),

    #[error("invalid lot size: {0}")]
    InvalidLotSize(u64),
}

pub type MmResult<T> = Result<T, MmError>;
