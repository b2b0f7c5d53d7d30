//! Collaborator interfaces consumed by the market maker.
//!
//! The trading engine (order book sync, fee estimates, order placement) and
//! the price oracle live outside this crate. Both are trait objects so that
//! tests can substitute recorders.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dexmm_core::{
    BookFeed, BookUpdate, EpochReport, MarketKey, OrderId, OrderReport, TradePlacement,
    TradePlacementReport,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::error::EngineError;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Trading engine operations used by a bot.
pub trait BotCoreAdaptor: Send + Sync {
    /// Subscribe to the market's order book.
    fn sync_book(&self, market: MarketKey) -> BoxFuture<'_, Result<BookFeed, EngineError>>;

    /// Estimated fees for one lot, in base atoms.
    fn order_fees_in_units(
        &self,
        sell: bool,
        use_max_rate: bool,
        basis_price: u64,
    ) -> BoxFuture<'_, Result<u64, EngineError>>;

    /// Place and maintain the given ladder on one side.
    fn multi_trade(
        &self,
        placements: Vec<TradePlacement>,
        sell: bool,
        drift_tolerance: f64,
        epoch: u64,
    ) -> BoxFuture<'_, (Vec<OrderId>, Option<OrderReport>)>;

    /// Cancel the bot's orders. Returns true once nothing is left to cancel.
    fn try_cancel_orders(&self, epoch: Option<u64>, all: bool) -> BoxFuture<'_, bool>;

    /// Fiat-derived message rate, 0 if unavailable.
    fn exchange_rate_from_fiat_sources(&self) -> u64;

    /// False if the bot should not trade this epoch.
    fn check_bot_health(&self, epoch: u64) -> bool;

    fn update_epoch_report(&self, report: EpochReport);
}

/// External price source.
#[cfg_attr(test, mockall::automock)]
pub trait Oracle: Send + Sync {
    /// Conventional-unit price of base in quote, 0 if unavailable.
    fn market_price(&self, base_id: u32, quote_id: u32) -> Decimal;
}

/// Arc wrapper for BotCoreAdaptor trait objects.
pub type DynBotCore = Arc<dyn BotCoreAdaptor>;

/// Arc wrapper for Oracle trait objects.
pub type DynOracle = Arc<dyn Oracle>;

/// Oracle returning a settable price for every pair.
#[derive(Debug, Default)]
pub struct StaticOracle {
    price: Mutex<Decimal>,
}

impl StaticOracle {
    pub fn new(price: Decimal) -> Self {
        Self {
            price: Mutex::new(price),
        }
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock() = price;
    }
}

impl Oracle for StaticOracle {
    fn market_price(&self, _base_id: u32, _quote_id: u32) -> Decimal {
        *self.price.lock()
    }
}

/// One recorded `multi_trade` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTradeCall {
    pub placements: Vec<TradePlacement>,
    pub sell: bool,
    pub drift_tolerance: f64,
    pub epoch: u64,
}

/// Recording trading engine for tests.
///
/// Every placement is reported as fully ordered. Fees, fiat rate and health
/// are settable.
#[derive(Debug)]
pub struct MockBotCore {
    sell_fees: Mutex<Result<u64, EngineError>>,
    buy_fees: Mutex<Result<u64, EngineError>>,
    fiat_rate: AtomicU64,
    healthy: AtomicBool,
    sync_error: Mutex<Option<EngineError>>,
    book_tx: Mutex<Option<mpsc::Sender<BookUpdate>>>,
    fee_requests: Mutex<Vec<(bool, bool, u64)>>,
    multi_trades: Mutex<Vec<MultiTradeCall>>,
    cancels: Mutex<Vec<(Option<u64>, bool)>>,
    epoch_reports: Mutex<Vec<EpochReport>>,
}

impl Default for MockBotCore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBotCore {
    pub fn new() -> Self {
        Self {
            sell_fees: Mutex::new(Ok(0)),
            buy_fees: Mutex::new(Ok(0)),
            fiat_rate: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
            sync_error: Mutex::new(None),
            book_tx: Mutex::new(None),
            fee_requests: Mutex::new(Vec::new()),
            multi_trades: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            epoch_reports: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fees(&self, sell: u64, buy: u64) {
        *self.sell_fees.lock() = Ok(sell);
        *self.buy_fees.lock() = Ok(buy);
    }

    pub fn set_fee_error(&self, sell: bool, err: EngineError) {
        if sell {
            *self.sell_fees.lock() = Err(err);
        } else {
            *self.buy_fees.lock() = Err(err);
        }
    }

    pub fn set_fiat_rate(&self, rate: u64) {
        self.fiat_rate.store(rate, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_sync_error(&self, err: EngineError) {
        *self.sync_error.lock() = Some(err);
    }

    /// Sender for the most recently synced book feed.
    pub fn book_sender(&self) -> Option<mpsc::Sender<BookUpdate>> {
        self.book_tx.lock().clone()
    }

    /// Drop the stored sender. The feed closes once all clones are gone.
    pub fn close_book(&self) {
        self.book_tx.lock().take();
    }

    /// Recorded `(sell, use_max_rate, basis_price)` fee requests.
    pub fn fee_requests(&self) -> Vec<(bool, bool, u64)> {
        self.fee_requests.lock().clone()
    }

    pub fn multi_trades(&self) -> Vec<MultiTradeCall> {
        self.multi_trades.lock().clone()
    }

    /// Recorded `(epoch, all)` cancel requests.
    pub fn cancels(&self) -> Vec<(Option<u64>, bool)> {
        self.cancels.lock().clone()
    }

    pub fn epoch_reports(&self) -> Vec<EpochReport> {
        self.epoch_reports.lock().clone()
    }
}

impl BotCoreAdaptor for MockBotCore {
    fn sync_book(&self, _market: MarketKey) -> BoxFuture<'_, Result<BookFeed, EngineError>> {
        Box::pin(async move {
            if let Some(err) = self.sync_error.lock().clone() {
                return Err(err);
            }
            let (tx, feed) = BookFeed::channel(16);
            *self.book_tx.lock() = Some(tx);
            Ok(feed)
        })
    }

    fn order_fees_in_units(
        &self,
        sell: bool,
        use_max_rate: bool,
        basis_price: u64,
    ) -> BoxFuture<'_, Result<u64, EngineError>> {
        Box::pin(async move {
            self.fee_requests
                .lock()
                .push((sell, use_max_rate, basis_price));
            if sell {
                self.sell_fees.lock().clone()
            } else {
                self.buy_fees.lock().clone()
            }
        })
    }

    fn multi_trade(
        &self,
        placements: Vec<TradePlacement>,
        sell: bool,
        drift_tolerance: f64,
        epoch: u64,
    ) -> BoxFuture<'_, (Vec<OrderId>, Option<OrderReport>)> {
        Box::pin(async move {
            let report = OrderReport {
                placements: placements
                    .iter()
                    .map(|p| TradePlacementReport {
                        rate: p.rate,
                        lots: p.lots,
                        standing_lots: 0,
                        ordered_lots: p.lots,
                        error: None,
                    })
                    .collect(),
                error: None,
            };
            self.multi_trades.lock().push(MultiTradeCall {
                placements,
                sell,
                drift_tolerance,
                epoch,
            });
            (Vec::new(), Some(report))
        })
    }

    fn try_cancel_orders(&self, epoch: Option<u64>, all: bool) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            self.cancels.lock().push((epoch, all));
            true
        })
    }

    fn exchange_rate_from_fiat_sources(&self) -> u64 {
        self.fiat_rate.load(Ordering::SeqCst)
    }

    fn check_bot_health(&self, _epoch: u64) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn update_epoch_report(&self, report: EpochReport) {
        self.epoch_reports.lock().push(report);
    }
}
