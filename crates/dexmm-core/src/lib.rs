//! Core domain types for the dexmm trading core.
//!
//! This crate provides the values shared by the account manager and the
//! market making bots:
//! - `rate`: message-rate encoding and rate-step quantization
//! - `Market`: live market context (lot size, rate step, formatting)
//! - `TradePlacement`, `FeeGapStats`, `EpochReport`: per-epoch outputs
//! - `BookFeed`, `BookUpdate`: the order book event feed a bot consumes

pub mod book;
pub mod error;
pub mod market;
pub mod rate;
pub mod report;

pub use book::{BookFeed, BookUpdate, MiniOrder, ResolvedEpoch};
pub use error::{CoreError, Result};
pub use market::{AssetInfo, Market, MarketKey};
pub use rate::{
    conventional_rate_to_msg, msg_rate_to_conventional, stepped_rate, try_conventional_rate_to_msg,
    RATE_ENCODING_FACTOR,
};
pub use report::{
    EpochReport, FeeGapStats, OrderId, OrderReport, PreOrderProblems, TradePlacement,
    TradePlacementReport,
};
