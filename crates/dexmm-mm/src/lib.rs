//! Basic market making for the dexmm trading core.
//!
//! Provides one bot per market that keeps a ladder of orders around a basis
//! price:
//! - `calculator`: basis price from oracle and fiat rates, fee gap from
//!   round-trip fees
//! - `planner`: per-rung rates from the configured gap strategy
//! - `basic_mm`: the epoch-driven rebalance loop
//!
//! # Architecture
//!
//! ```text
//! BookFeed ─► BasicMarketMaker.bot_loop()
//!                 └─ rebalance(epoch)
//!                      ├─ BotCoreAdaptor.check_bot_health()
//!                      ├─ planner::orders_to_place()
//!                      │    └─ BasicMmCalculator: basis price, fee gap
//!                      ├─ BotCoreAdaptor.multi_trade(buys), multi_trade(sells)
//!                      └─ BotCoreAdaptor.update_epoch_report()
//! ```

pub mod adaptor;
pub mod basic_mm;
pub mod calculator;
pub mod config;
pub mod error;
pub mod planner;

pub use adaptor::{
    BotCoreAdaptor, BoxFuture, DynBotCore, DynOracle, MockBotCore, MultiTradeCall, Oracle,
    StaticOracle,
};
pub use basic_mm::{BasicMarketMaker, RebalanceOutcome};
pub use calculator::{BasicMmCalculator, BasicMmCalculatorImpl, MAX_ORACLE_FIAT_MISMATCH};
pub use config::{
    update_lot_size, BasicMarketMakingConfig, GapStrategy, OrderPlacement,
    DEFAULT_DRIFT_TOLERANCE, MAX_DRIFT_TOLERANCE,
};
pub use error::{CalcError, ConfigError, EngineError, MmError, MmResult};
pub use planner::{order_price, orders_to_place, PlannedOrders};
