//! Basic market maker.
//!
//! Keeps a ladder of buy and sell orders around the basis price, rebuilt on
//! every epoch boundary of the market's order book.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──► bot_loop() ──► [ResolvedEpoch] ──► rebalance(epoch)
//!                 │
//!                 ├── shutdown token cancelled ──► exit
//!                 └── book feed closed ──► kill() ──► exit
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dexmm_core::{BookUpdate, EpochReport, FeeGapStats, Market, TradePlacement};
use dexmm_telemetry::Metrics;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::adaptor::{DynBotCore, DynOracle};
use crate::calculator::{BasicMmCalculator, BasicMmCalculatorImpl};
use crate::config::BasicMarketMakingConfig;
use crate::error::{MmError, MmResult};
use crate::planner::orders_to_place;

/// What a single `rebalance` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceOutcome {
    /// Another rebalance was already running.
    Skipped,
    /// Health check failed; orders were cancelled.
    Unhealthy,
    /// Pricing failed; orders were cancelled and problems reported.
    PreOrderFailure,
    /// Both sides were submitted.
    Placed,
}

impl RebalanceOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RebalanceOutcome::Skipped => "skipped",
            RebalanceOutcome::Unhealthy => "unhealthy",
            RebalanceOutcome::PreOrderFailure => "pre_order_failure",
            RebalanceOutcome::Placed => "placed",
        }
    }
}

/// Clears the running flag on drop.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunningGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Market maker for one market.
pub struct BasicMarketMaker {
    market: Arc<Market>,
    core: DynBotCore,
    oracle: DynOracle,
    cfg: RwLock<Arc<BasicMarketMakingConfig>>,
    calculator: RwLock<Option<Arc<dyn BasicMmCalculator>>>,
    /// Set while a rebalance is in progress.
    running: AtomicBool,
    /// Owned by the supervisor; cancelling asks it to stop this bot.
    kill: CancellationToken,
    fee_gap: Mutex<Option<FeeGapStats>>,
}

impl BasicMarketMaker {
    /// Create a market maker.
    ///
    /// # Errors
    /// Returns `MmError::InvalidConfig` if the config fails validation.
    pub fn new(
        mut cfg: BasicMarketMakingConfig,
        market: Arc<Market>,
        core: DynBotCore,
        oracle: DynOracle,
        kill: CancellationToken,
    ) -> MmResult<Self> {
        cfg.validate()?;
        Ok(Self {
            market,
            core,
            oracle,
            cfg: RwLock::new(Arc::new(cfg)),
            calculator: RwLock::new(None),
            running: AtomicBool::new(false),
            kill,
            fee_gap: Mutex::new(None),
        })
    }

    pub fn market(&self) -> &Arc<Market> {
        &self.market
    }

    /// Current config snapshot.
    pub fn cfg(&self) -> Arc<BasicMarketMakingConfig> {
        self.cfg.read().clone()
    }

    /// Replace the price calculator.
    pub fn set_calculator(&self, calculator: Arc<dyn BasicMmCalculator>) {
        *self.calculator.write() = Some(calculator);
    }

    /// Installed calculator, creating the oracle-backed one on first use.
    fn calculator(&self) -> Arc<dyn BasicMmCalculator> {
        if let Some(calculator) = self.calculator.read().as_ref() {
            return calculator.clone();
        }
        let mut slot = self.calculator.write();
        match slot.as_ref() {
            Some(calculator) => calculator.clone(),
            None => {
                let calculator: Arc<dyn BasicMmCalculator> = Arc::new(BasicMmCalculatorImpl::new(
                    self.market.clone(),
                    self.oracle.clone(),
                    self.core.clone(),
                ));
                *slot = Some(calculator.clone());
                calculator
            }
        }
    }

    /// Fee gap stats from the last successful pricing.
    pub fn latest_fee_gap(&self) -> Option<FeeGapStats> {
        *self.fee_gap.lock()
    }

    fn register_fee_gap(&self, stats: FeeGapStats) {
        let name = self.market.name();
        Metrics::basis_price(name, stats.basis_price);
        Metrics::fee_gap(name, stats.fee_gap);
        *self.fee_gap.lock() = Some(stats);
    }

    /// Ask the supervisor to stop this bot.
    pub fn kill(&self) {
        self.kill.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Rescale the config for a new market lot size and store the new size.
    ///
    /// Call while the bot is paused.
    ///
    /// # Errors
    /// `MmError::InvalidLotSize` for a zero lot size, `MmError::InvalidConfig`
    /// if the rescaled config fails validation (nothing is changed).
    pub fn update_lot_size(&self, new_lot_size: u64) -> MmResult<()> {
        if new_lot_size == 0 {
            return Err(MmError::InvalidLotSize(new_lot_size));
        }
        let original_lot_size = self.market.lot_size();
        let mut cfg = (**self.cfg.read()).clone();
        cfg.update_lot_size(original_lot_size, new_lot_size);
        cfg.validate()?;

        *self.cfg.write() = Arc::new(cfg);
        self.market.set_lot_size(new_lot_size);
        info!(
            market = %self.market,
            original = %self.market.fmt_base(original_lot_size),
            new = %self.market.fmt_base(new_lot_size),
            "Lot size updated"
        );
        Ok(())
    }

    /// Rebuild both sides of the ladder for `epoch`.
    ///
    /// Returns immediately if a rebalance is already in progress.
    pub async fn rebalance(&self, epoch: u64) -> RebalanceOutcome {
        let name = self.market.name();
        let Some(_guard) = RunningGuard::try_acquire(&self.running) else {
            debug!(market = %self.market, epoch, "Rebalance already running, skipping");
            Metrics::rebalance_skipped(name);
            return RebalanceOutcome::Skipped;
        };
        let started = Instant::now();
        debug!(market = %self.market, epoch, "Rebalance");

        if !self.core.check_bot_health(epoch) {
            warn!(market = %self.market, epoch, "Bot unhealthy, cancelling orders");
            self.core.try_cancel_orders(Some(epoch), false).await;
            return self.finish(RebalanceOutcome::Unhealthy, started);
        }

        let calculator = self.calculator();
        let cfg = self.cfg();
        let mut report = EpochReport::new(epoch);

        let outcome = match orders_to_place(calculator.as_ref(), &cfg, &self.market).await {
            Err(err) => {
                warn!(market = %self.market, epoch, error = %err, "Error getting orders to place");
                self.core.try_cancel_orders(Some(epoch), false).await;
                let problems = err.pre_order_problems();
                Metrics::pre_order_problem(name, problems.kind());
                report.set_pre_order_problems(Some(problems));
                RebalanceOutcome::PreOrderFailure
            }
            Ok(planned) => {
                self.register_fee_gap(planned.fee_gap);
                self.log_placements(&planned.buys, false);
                self.log_placements(&planned.sells, true);
                Metrics::placements(name, "buy", count_active(&planned.buys));
                Metrics::placements(name, "sell", count_active(&planned.sells));

                let (_, buys_report) = self
                    .core
                    .multi_trade(planned.buys, false, cfg.drift_tolerance, epoch)
                    .await;
                let (_, sells_report) = self
                    .core
                    .multi_trade(planned.sells, true, cfg.drift_tolerance, epoch)
                    .await;
                report.buys_report = buys_report;
                report.sells_report = sells_report;
                RebalanceOutcome::Placed
            }
        };

        self.core.update_epoch_report(report);
        self.finish(outcome, started)
    }

    fn finish(&self, outcome: RebalanceOutcome, started: Instant) -> RebalanceOutcome {
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        Metrics::rebalance(self.market.name(), outcome.as_str(), duration_ms);
        debug!(
            market = %self.market,
            outcome = outcome.as_str(),
            duration_ms,
            "Rebalance finished"
        );
        outcome
    }

    fn log_placements(&self, placements: &[TradePlacement], sell: bool) {
        let side = if sell { "sell" } else { "buy" };
        for (i, p) in placements.iter().enumerate() {
            trace!(
                market = %self.market,
                side,
                rung = i,
                rate = %self.market.fmt_rate(p.rate),
                lots = p.lots,
                "Placement"
            );
        }
    }

    /// Subscribe to the market's book and rebalance on every new epoch.
    ///
    /// The returned task runs until `shutdown` is cancelled or the feed
    /// closes. A closed feed is fatal and triggers `kill()`. A rebalance in
    /// progress always completes before shutdown is observed.
    ///
    /// # Errors
    /// `MmError::SyncBook` if the book subscription fails.
    pub async fn bot_loop(self: Arc<Self>, shutdown: CancellationToken) -> MmResult<JoinHandle<()>> {
        let mut feed = self
            .core
            .sync_book(self.market.key())
            .await
            .map_err(MmError::SyncBook)?;

        self.calculator();
        let cfg = self.cfg();
        info!(
            market = %self.market,
            strategy = %cfg.gap_strategy,
            buys = cfg.buy_placements.len(),
            sells = cfg.sell_placements.len(),
            "Basic market maker started"
        );

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    () = shutdown.cancelled() => {
                        info!(market = %self.market, "Shutdown requested, stopping market maker");
                        break;
                    }

                    update = feed.next() => match update {
                        Some(BookUpdate::ResolvedEpoch(epoch)) => {
                            self.rebalance(epoch.current).await;
                        }
                        Some(_) => {}
                        None => {
                            error!(market = %self.market, "Book feed closed");
                            self.kill();
                            break;
                        }
                    },
                }
            }
            feed.close();
        });

        Ok(handle)
    }
}

impl std::fmt::Debug for BasicMarketMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicMarketMaker")
            .field("market", &self.market.to_string())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn count_active(placements: &[TradePlacement]) -> usize {
    placements.iter().filter(|p| !p.is_skip()).count()
}
