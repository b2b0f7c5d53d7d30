//! Basis price and fee gap calculation.
//!
//! The basis price is the oracle rate, sanity checked against fiat-derived
//! rates. The fee gap is the spread around the basis price that exactly
//! pays for one round trip (sell a lot, buy it back) in fees.

use std::sync::Arc;

use dexmm_core::{stepped_rate, FeeGapStats, Market, RATE_ENCODING_FACTOR};
use tracing::{info, trace, warn};

use crate::adaptor::{BoxFuture, DynBotCore, DynOracle};
use crate::error::CalcError;

/// Oracle and fiat rates may differ by at most this fraction of the oracle rate.
pub const MAX_ORACLE_FIAT_MISMATCH: f64 = 0.05;

/// Price inputs for the order planner.
pub trait BasicMmCalculator: Send + Sync {
    /// Current basis price as a message rate, quantized to the rate step.
    fn basis_price(&self) -> Result<u64, CalcError>;

    /// Break-even distance from the basis price: half the fee gap.
    fn half_spread(&self, basis_price: u64) -> BoxFuture<'_, Result<u64, CalcError>>;

    fn fee_gap_stats(&self, basis_price: u64) -> BoxFuture<'_, Result<FeeGapStats, CalcError>>;
}

/// Calculator backed by the oracle and the trading engine.
pub struct BasicMmCalculatorImpl {
    market: Arc<Market>,
    oracle: DynOracle,
    core: DynBotCore,
}

impl BasicMmCalculatorImpl {
    pub fn new(market: Arc<Market>, oracle: DynOracle, core: DynBotCore) -> Self {
        Self {
            market,
            oracle,
            core,
        }
    }
}

impl BasicMmCalculator for BasicMmCalculatorImpl {
    fn basis_price(&self) -> Result<u64, CalcError> {
        let market = &self.market;
        let oracle_rate = market.msg_rate(
            self.oracle
                .market_price(market.base_id(), market.quote_id()),
        );
        trace!(market = %market.name(), oracle_rate = %market.fmt_rate(oracle_rate), "Oracle rate");

        let fiat_rate = self.core.exchange_rate_from_fiat_sources();
        let rate_step = market.rate_step();

        if fiat_rate == 0 {
            warn!(
                market = %market.name(),
                "No fiat-based rate estimate available for sanity check"
            );
            if oracle_rate == 0 {
                return Err(CalcError::NoBasisPrice);
            }
            return Ok(stepped_rate(oracle_rate, rate_step));
        }

        if oracle_rate == 0 {
            info!(
                market = %market.name(),
                fiat_rate = %market.fmt_rate(fiat_rate),
                "No oracle rate available, using fiat-derived basis rate"
            );
            return Ok(stepped_rate(fiat_rate, rate_step));
        }

        let mismatch = (oracle_rate as f64 - fiat_rate as f64).abs() / oracle_rate as f64;
        if mismatch > MAX_ORACLE_FIAT_MISMATCH {
            warn!(
                market = %market.name(),
                oracle_rate = %market.fmt_rate(oracle_rate),
                fiat_rate = %market.fmt_rate(fiat_rate),
                mismatch,
                "Oracle rate sanity check failed"
            );
            return Err(CalcError::OracleFiatMismatch {
                oracle: oracle_rate,
                fiat: fiat_rate,
            });
        }

        Ok(stepped_rate(oracle_rate, rate_step))
    }

    fn half_spread(&self, basis_price: u64) -> BoxFuture<'_, Result<u64, CalcError>> {
        Box::pin(async move {
            let stats = self.fee_gap_stats(basis_price).await?;
            Ok(stats.fee_gap / 2)
        })
    }

    fn fee_gap_stats(&self, basis_price: u64) -> BoxFuture<'_, Result<FeeGapStats, CalcError>> {
        Box::pin(async move {
            if basis_price == 0 {
                return Err(CalcError::ZeroBasisPrice);
            }

            let sell_fees = self
                .core
                .order_fees_in_units(true, true, basis_price)
                .await
                .map_err(|source| CalcError::Fees {
                    side: "sell",
                    source,
                })?;
            let buy_fees = self
                .core
                .order_fees_in_units(false, true, basis_price)
                .await
                .map_err(|source| CalcError::Fees {
                    side: "buy",
                    source,
                })?;

            // Choose half-gap g so that selling a lot at r + g and buying it
            // back at r - g nets l + f:
            //   (r + g) * l / (r - g) = l + f  =>  g = f * r / (f + 2l)
            let market = &self.market;
            let f = sell_fees.saturating_add(buy_fees);
            let l = market.lot_size();
            let r = basis_price as f64 / RATE_ENCODING_FACTOR as f64;
            let denom = f as f64 + 2.0 * l as f64;
            let g = if denom > 0.0 { f as f64 * r / denom } else { 0.0 };
            let half_gap = (g * RATE_ENCODING_FACTOR as f64).round() as u64;
            let fee_gap = stepped_rate(half_gap.saturating_mul(2), market.rate_step());

            trace!(
                market = %market.name(),
                basis_price = %market.fmt_rate(basis_price),
                lot_size = %market.fmt_base(l),
                fees = %market.fmt_base_fees(f),
                sell_fees = %market.fmt_base_fees(sell_fees),
                buy_fees = %market.fmt_base_fees(buy_fees),
                half_gap = %market.fmt_rate(half_gap),
                "Fee gap"
            );

            Ok(FeeGapStats {
                basis_price,
                remote_gap: 0,
                fee_gap,
                round_trip_fees: f,
            })
        })
    }
}
