//! Basic market making configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MmError};

/// How far from the basis price each placement goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapStrategy {
    /// Gap factor times the break-even half-spread.
    Multiplier,
    /// Fixed conventional rate.
    Absolute,
    /// Fixed conventional rate plus the break-even half-spread.
    AbsolutePlus,
    /// Fraction of the basis price.
    Percent,
    /// Fraction of the basis price plus the break-even half-spread.
    PercentPlus,
}

impl GapStrategy {
    /// True if placement prices depend on the break-even half-spread.
    pub fn needs_break_even_half_spread(self) -> bool {
        matches!(
            self,
            GapStrategy::AbsolutePlus | GapStrategy::PercentPlus | GapStrategy::Multiplier
        )
    }

    /// Inclusive gap factor bounds.
    pub fn limits(self) -> (f64, f64) {
        match self {
            GapStrategy::Multiplier => (1.0, 100.0),
            GapStrategy::Percent | GapStrategy::PercentPlus => (0.0, 0.1),
            // validated against the spot price at creation time
            GapStrategy::Absolute | GapStrategy::AbsolutePlus => (0.0, f64::MAX),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GapStrategy::Multiplier => "multiplier",
            GapStrategy::Absolute => "absolute",
            GapStrategy::AbsolutePlus => "absolute-plus",
            GapStrategy::Percent => "percent",
            GapStrategy::PercentPlus => "percent-plus",
        }
    }
}

impl fmt::Display for GapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rung of the ladder on one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacement {
    /// Maximum lots to place at this distance.
    pub lots: u64,
    /// Distance from the basis price; meaning depends on the strategy.
    #[serde(alias = "gap_factor")]
    pub gap_factor: f64,
}

impl OrderPlacement {
    pub fn new(lots: u64, gap_factor: f64) -> Self {
        Self { lots, gap_factor }
    }
}

/// Basic market maker settings for one market.
///
/// Placements are in priority order: when funds run short, earlier rungs
/// are filled first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicMarketMakingConfig {
    #[serde(alias = "gap_strategy")]
    pub gap_strategy: GapStrategy,
    #[serde(default, alias = "sell_placements")]
    pub sell_placements: Vec<OrderPlacement>,
    #[serde(default, alias = "buy_placements")]
    pub buy_placements: Vec<OrderPlacement>,
    /// Fractional price drift an existing order may have before it is
    /// replaced. Zero means "use the default".
    #[serde(default, alias = "drift_tolerance")]
    pub drift_tolerance: f64,
}

pub const DEFAULT_DRIFT_TOLERANCE: f64 = 0.001;
pub const MAX_DRIFT_TOLERANCE: f64 = 0.01;

impl BasicMarketMakingConfig {
    /// Parse from the JSON wire shape and validate.
    pub fn from_json(s: &str) -> Result<Self, MmError> {
        let mut cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check bounds and uniqueness, filling in the default drift tolerance.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.drift_tolerance == 0.0 {
            self.drift_tolerance = DEFAULT_DRIFT_TOLERANCE;
        }
        if !(0.0..=MAX_DRIFT_TOLERANCE).contains(&self.drift_tolerance) {
            return Err(ConfigError::DriftTolerance(self.drift_tolerance));
        }

        validate_side(self.gap_strategy, &self.sell_placements, "sell")?;
        validate_side(self.gap_strategy, &self.buy_placements, "buy")?;
        Ok(())
    }

    /// Rescale placements after a lot size change so that no side ever
    /// commits more base quantity than it did with the original lot size.
    pub fn update_lot_size(&mut self, original_lot_size: u64, new_lot_size: u64) {
        self.sell_placements =
            update_lot_size(&self.sell_placements, original_lot_size, new_lot_size);
        self.buy_placements =
            update_lot_size(&self.buy_placements, original_lot_size, new_lot_size);
    }
}

fn validate_side(
    strategy: GapStrategy,
    placements: &[OrderPlacement],
    side: &'static str,
) -> Result<(), ConfigError> {
    let (min, max) = strategy.limits();
    let mut seen: Vec<f64> = Vec::with_capacity(placements.len());
    for p in placements {
        if seen.contains(&p.gap_factor) {
            return Err(ConfigError::DuplicatePlacement {
                side,
                gap_factor: p.gap_factor,
            });
        }
        seen.push(p.gap_factor);

        // NaN fails the range check
        if !(min..=max).contains(&p.gap_factor) {
            return Err(ConfigError::GapFactorOutOfBounds {
                side,
                strategy,
                gap_factor: p.gap_factor,
                min,
                max,
            });
        }
    }
    Ok(())
}

/// Rescale one side's placements from `original_lot_size` to `new_lot_size`.
///
/// Each rung keeps roughly the same base quantity (at least one lot), capped
/// by what is left of the side's original total. Rungs that end up with
/// zero lots are dropped. A zero `new_lot_size` leaves placements unchanged.
pub fn update_lot_size(
    placements: &[OrderPlacement],
    original_lot_size: u64,
    new_lot_size: u64,
) -> Vec<OrderPlacement> {
    if new_lot_size == 0 {
        return placements.to_vec();
    }
    let orig = u128::from(original_lot_size);
    let new = u128::from(new_lot_size);

    let mut remaining: u128 = placements
        .iter()
        .map(|p| u128::from(p.lots) * orig)
        .sum();

    let mut out = Vec::with_capacity(placements.len());
    for p in placements {
        // round half up
        let qty = u128::from(p.lots) * orig;
        let lots = ((2 * qty + new) / (2 * new)).max(1).min(remaining / new);
        if lots == 0 {
            continue;
        }
        remaining -= lots * new;
        out.push(OrderPlacement {
            lots: u64::try_from(lots).unwrap_or(u64::MAX),
            gap_factor: p.gap_factor,
        });
    }
    out
}
