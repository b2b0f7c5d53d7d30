//! Order placement planning.
//!
//! Turns the configured ladder into concrete `(rate, lots)` placements for
//! one epoch, relative to the current basis price.

use dexmm_core::{stepped_rate, CoreError, FeeGapStats, Market, TradePlacement};
use rust_decimal::Decimal;

use crate::calculator::BasicMmCalculator;
use crate::config::{BasicMarketMakingConfig, GapStrategy, OrderPlacement};
use crate::error::CalcError;

/// Placements for both sides of one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOrders {
    /// Buy rungs, in configured priority order.
    pub buys: Vec<TradePlacement>,
    /// Sell rungs, in configured priority order.
    pub sells: Vec<TradePlacement>,
    pub fee_gap: FeeGapStats,
}

/// Rate for a single rung.
///
/// The distance from `basis_price` is derived from `gap_factor` according to
/// `strategy`, with `fee_adj` added for the "-plus" strategies, then
/// quantized to the market's rate step. A buy whose distance exceeds the
/// basis price gets rate 0.
pub fn order_price(
    strategy: GapStrategy,
    basis_price: u64,
    fee_adj: u64,
    sell: bool,
    gap_factor: f64,
    market: &Market,
) -> u64 {
    let mut adj = match strategy {
        GapStrategy::Multiplier => (fee_adj as f64 * gap_factor).round() as u64,
        GapStrategy::Percent | GapStrategy::PercentPlus => {
            (gap_factor * basis_price as f64).round() as u64
        }
        GapStrategy::Absolute | GapStrategy::AbsolutePlus => absolute_offset(gap_factor, market),
    };

    if matches!(strategy, GapStrategy::AbsolutePlus | GapStrategy::PercentPlus) {
        adj = adj.saturating_add(fee_adj);
    }

    let adj = stepped_rate(adj, market.rate_step());

    if sell {
        basis_price.saturating_add(adj)
    } else {
        basis_price.saturating_sub(adj)
    }
}

/// Message-rate offset for an absolute gap factor. An offset too large to
/// encode saturates, so a buy clamps to 0 rather than landing on the basis.
fn absolute_offset(gap_factor: f64, market: &Market) -> u64 {
    Decimal::try_from(gap_factor)
        .map_err(CoreError::from)
        .and_then(|offset| market.try_msg_rate(offset))
        .unwrap_or(u64::MAX)
}

/// Plan this epoch's placements for both sides.
///
/// Fails if no basis price is available or fees cannot be estimated. A rung
/// priced at zero is kept with zero lots so that report indices line up
/// with the configuration.
pub async fn orders_to_place(
    calculator: &dyn BasicMmCalculator,
    cfg: &BasicMarketMakingConfig,
    market: &Market,
) -> Result<PlannedOrders, CalcError> {
    let basis_price = calculator.basis_price()?;
    let fee_gap = calculator.fee_gap_stats(basis_price).await?;

    let fee_adj = if cfg.gap_strategy.needs_break_even_half_spread() {
        fee_gap.fee_gap / 2
    } else {
        0
    };

    let side = |placements: &[OrderPlacement], sell: bool| {
        placements
            .iter()
            .map(|p| {
                let rate = order_price(
                    cfg.gap_strategy,
                    basis_price,
                    fee_adj,
                    sell,
                    p.gap_factor,
                    market,
                );
                let lots = if rate == 0 { 0 } else { p.lots };
                TradePlacement::new(rate, lots)
            })
            .collect::<Vec<_>>()
    };

    Ok(PlannedOrders {
        buys: side(&cfg.buy_placements, false),
        sells: side(&cfg.sell_placements, true),
        fee_gap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptor::BoxFuture;
    use dexmm_core::AssetInfo;

    fn market(rate_step: u64) -> Market {
        Market::new(
            "dex.example.org:7232",
            AssetInfo::new(42, "dcr", 100_000_000),
            AssetInfo::new(0, "btc", 100_000_000),
            100_000_000,
            rate_step,
        )
        .unwrap()
    }

    /// Calculator with fixed outputs.
    struct FixedCalculator {
        basis_price: Result<u64, CalcError>,
        fee_gap: u64,
    }

    impl BasicMmCalculator for FixedCalculator {
        fn basis_price(&self) -> Result<u64, CalcError> {
            self.basis_price.clone()
        }

        fn half_spread(&self, _basis_price: u64) -> BoxFuture<'_, Result<u64, CalcError>> {
            Box::pin(async move { Ok(self.fee_gap / 2) })
        }

        fn fee_gap_stats(&self, basis_price: u64) -> BoxFuture<'_, Result<FeeGapStats, CalcError>> {
            Box::pin(async move {
                Ok(FeeGapStats {
                    basis_price,
                    remote_gap: 0,
                    fee_gap: self.fee_gap,
                    round_trip_fees: 1_000,
                })
            })
        }
    }

    #[test]
    fn test_order_price_percent() {
        let m = market(1);
        assert_eq!(
            order_price(GapStrategy::Percent, 1_000_000, 0, true, 0.01, &m),
            1_010_000
        );
        assert_eq!(
            order_price(GapStrategy::Percent, 1_000_000, 0, false, 0.01, &m),
            990_000
        );
    }

    #[test]
    fn test_order_price_percent_plus_adds_fee_adj() {
        let m = market(1);
        assert_eq!(
            order_price(GapStrategy::PercentPlus, 1_000_000, 500, true, 0.01, &m),
            1_010_500
        );
        assert_eq!(
            order_price(GapStrategy::PercentPlus, 1_000_000, 500, false, 0.01, &m),
            989_500
        );
    }

    #[test]
    fn test_order_price_multiplier() {
        let m = market(1);
        assert_eq!(
            order_price(GapStrategy::Multiplier, 1_000_000, 2_000, true, 1.5, &m),
            1_003_000
        );
        assert_eq!(
            order_price(GapStrategy::Multiplier, 1_000_000, 2_000, false, 2.0, &m),
            996_000
        );
    }

    #[test]
    fn test_order_price_absolute() {
        let m = market(1);
        // 0.0001 BTC/DCR = 10_000 msg rate
        assert_eq!(
            order_price(GapStrategy::Absolute, 1_000_000, 777, true, 0.0001, &m),
            1_010_000
        );
        assert_eq!(
            order_price(GapStrategy::AbsolutePlus, 1_000_000, 1_000, false, 0.0001, &m),
            989_000
        );
    }

    #[test]
    fn test_order_price_quantizes_adjustment() {
        let m = market(1_000);
        // adj 12_345 steps to 12_000
        assert_eq!(
            order_price(GapStrategy::Multiplier, 1_000_000, 12_345, true, 1.0, &m),
            1_012_000
        );
    }

    #[test]
    fn test_order_price_buy_below_zero() {
        let m = market(1);
        assert_eq!(
            order_price(GapStrategy::Absolute, 1_000, 0, false, 1.0, &m),
            0
        );
    }

    #[test]
    fn test_order_price_absolute_unencodable_offset() {
        let m = market(1_000);
        // 1e12 BTC/DCR overflows the message rate, 1e30 overflows Decimal
        for gap_factor in [1e12, 1e30, f64::MAX] {
            assert_eq!(
                order_price(GapStrategy::Absolute, 500_000, 0, false, gap_factor, &m),
                0,
                "buy at {gap_factor}"
            );
            assert_eq!(
                order_price(GapStrategy::AbsolutePlus, 500_000, 1_000, true, gap_factor, &m),
                u64::MAX,
                "sell at {gap_factor}"
            );
        }
    }

    #[tokio::test]
    async fn test_orders_to_place_far_absolute_rung_is_skipped() {
        let m = market(1);
        let calc = FixedCalculator {
            basis_price: Ok(500_000),
            fee_gap: 0,
        };
        let mut cfg = BasicMarketMakingConfig {
            gap_strategy: GapStrategy::Absolute,
            sell_placements: vec![],
            buy_placements: vec![OrderPlacement::new(1, 0.001), OrderPlacement::new(2, 1e12)],
            drift_tolerance: 0.0,
        };
        cfg.validate().unwrap();

        let planned = orders_to_place(&calc, &cfg, &m).await.unwrap();
        assert_eq!(
            planned.buys,
            vec![TradePlacement::new(400_000, 1), TradePlacement::new(0, 0)]
        );
    }

    #[tokio::test]
    async fn test_orders_to_place_percent() {
        let m = market(1);
        let calc = FixedCalculator {
            basis_price: Ok(500_000),
            fee_gap: 4_000,
        };
        let cfg = BasicMarketMakingConfig {
            gap_strategy: GapStrategy::Percent,
            sell_placements: vec![OrderPlacement::new(2, 0.02)],
            buy_placements: vec![OrderPlacement::new(1, 0.01)],
            drift_tolerance: 0.001,
        };

        let planned = orders_to_place(&calc, &cfg, &m).await.unwrap();
        assert_eq!(planned.buys, vec![TradePlacement::new(495_000, 1)]);
        assert_eq!(planned.sells, vec![TradePlacement::new(510_000, 2)]);
        assert_eq!(planned.fee_gap.fee_gap, 4_000);
        assert_eq!(planned.fee_gap.basis_price, 500_000);
    }

    #[tokio::test]
    async fn test_orders_to_place_multiplier_uses_half_fee_gap() {
        let m = market(1);
        let calc = FixedCalculator {
            basis_price: Ok(500_000),
            fee_gap: 4_000,
        };
        let cfg = BasicMarketMakingConfig {
            gap_strategy: GapStrategy::Multiplier,
            sell_placements: vec![OrderPlacement::new(1, 1.0), OrderPlacement::new(3, 2.0)],
            buy_placements: vec![OrderPlacement::new(1, 1.0)],
            drift_tolerance: 0.001,
        };

        let planned = orders_to_place(&calc, &cfg, &m).await.unwrap();
        assert_eq!(
            planned.sells,
            vec![
                TradePlacement::new(502_000, 1),
                TradePlacement::new(504_000, 3)
            ]
        );
        assert_eq!(planned.buys, vec![TradePlacement::new(498_000, 1)]);
    }

    #[tokio::test]
    async fn test_orders_to_place_zero_rate_gets_zero_lots() {
        let m = market(1);
        let calc = FixedCalculator {
            basis_price: Ok(1_000),
            fee_gap: 0,
        };
        let cfg = BasicMarketMakingConfig {
            gap_strategy: GapStrategy::Absolute,
            sell_placements: vec![],
            buy_placements: vec![OrderPlacement::new(5, 1.0)],
            drift_tolerance: 0.001,
        };

        let planned = orders_to_place(&calc, &cfg, &m).await.unwrap();
        assert_eq!(planned.buys, vec![TradePlacement::new(0, 0)]);
        assert!(planned.buys[0].is_skip());
        assert!(planned.sells.is_empty());
    }

    #[tokio::test]
    async fn test_orders_to_place_propagates_basis_error() {
        let m = market(1);
        let calc = FixedCalculator {
            basis_price: Err(CalcError::NoBasisPrice),
            fee_gap: 0,
        };
        let cfg = BasicMarketMakingConfig {
            gap_strategy: GapStrategy::Percent,
            sell_placements: vec![OrderPlacement::new(1, 0.01)],
            buy_placements: vec![],
            drift_tolerance: 0.001,
        };
        assert!(matches!(
            orders_to_place(&calc, &cfg, &m).await,
            Err(CalcError::NoBasisPrice)
        ));
    }
}
