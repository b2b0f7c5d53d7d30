//! Per-epoch outputs of a market making bot.
//!
//! `TradePlacement` is what the planner asks for, `OrderReport` is what the
//! trading engine says it did with it, and `EpochReport` ties both sides of
//! one rebalance together for the UI layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One rung of a price ladder: `lots` at `rate`.
///
/// `lots == 0` means "skip this rung".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePlacement {
    pub rate: u64,
    pub lots: u64,
}

impl TradePlacement {
    pub fn new(rate: u64, lots: u64) -> Self {
        Self { rate, lots }
    }

    #[inline]
    pub fn is_skip(&self) -> bool {
        self.lots == 0
    }
}

/// Snapshot of the fee-derived spread at a basis price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeGapStats {
    pub basis_price: u64,
    pub remote_gap: u64,
    pub fee_gap: u64,
    pub round_trip_fees: u64,
}

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub [u8; 32]);

impl OrderId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Outcome of one requested placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePlacementReport {
    pub rate: u64,
    pub lots: u64,
    /// Lots already resting on the book at this rate before the epoch.
    pub standing_lots: u64,
    /// Lots newly ordered this epoch.
    pub ordered_lots: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-side report produced by the trading engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReport {
    pub placements: Vec<TradePlacementReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OrderReport {
    /// True if the side or any placement carries an error.
    pub fn has_errors(&self) -> bool {
        self.error.is_some() || self.placements.iter().any(|p| p.error.is_some())
    }

    pub fn ordered_lots(&self) -> u64 {
        self.placements.iter().map(|p| p.ordered_lots).sum()
    }
}

/// Problems that prevented any placement from being attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreOrderProblems {
    /// Neither the oracle nor the fiat sources produced a rate.
    pub no_price_source: bool,
    /// Oracle and fiat rates disagree beyond the sanity threshold.
    pub oracle_fiat_mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_error: Option<String>,
}

impl PreOrderProblems {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self {
            unknown_error: Some(msg.into()),
            ..Default::default()
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        if self.no_price_source {
            "no_price_source"
        } else if self.oracle_fiat_mismatch {
            "oracle_fiat_mismatch"
        } else {
            "unknown"
        }
    }
}

/// Everything one rebalance produced.
///
/// Pre-order problems set with both side reports `None` means nothing was
/// attempted. Side reports present means placements were attempted, though
/// some may have failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochReport {
    pub epoch_num: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_order_problems: Option<PreOrderProblems>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buys_report: Option<OrderReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sells_report: Option<OrderReport>,
}

impl EpochReport {
    pub fn new(epoch_num: u64) -> Self {
        Self {
            epoch_num,
            ..Default::default()
        }
    }

    /// Record the problems that stopped placement. `None` leaves the field
    /// untouched.
    pub fn set_pre_order_problems(&mut self, problems: Option<PreOrderProblems>) {
        if let Some(problems) = problems {
            self.pre_order_problems = Some(problems);
        }
    }

    /// True if no placement was attempted this epoch.
    pub fn is_pre_order_failure(&self) -> bool {
        self.pre_order_problems.is_some()
            && self.buys_report.is_none()
            && self.sells_report.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_gap_stats_json_shape() {
        let stats = FeeGapStats {
            basis_price: 1_000_000,
            remote_gap: 0,
            fee_gap: 2_000,
            round_trip_fees: 20_000,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["basisPrice"], 1_000_000);
        assert_eq!(json["remoteGap"], 0);
        assert_eq!(json["feeGap"], 2_000);
        assert_eq!(json["roundTripFees"], 20_000);
    }

    #[test]
    fn test_order_id_display_is_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let id = OrderId(bytes);
        let s = id.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.starts_with("ab"));
        assert!(s.ends_with("01"));
    }

    #[test]
    fn test_set_pre_order_problems() {
        let mut report = EpochReport::new(7);
        report.set_pre_order_problems(None);
        assert!(report.pre_order_problems.is_none());
        assert!(!report.is_pre_order_failure());

        report.set_pre_order_problems(Some(PreOrderProblems {
            no_price_source: true,
            ..Default::default()
        }));
        assert!(report.is_pre_order_failure());
        assert_eq!(report.pre_order_problems.as_ref().unwrap().kind(), "no_price_source");
    }

    #[test]
    fn test_epoch_report_json_omits_missing_sides() {
        let mut report = EpochReport::new(3);
        report.buys_report = Some(OrderReport::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["epochNum"], 3);
        assert!(json.get("buysReport").is_some());
        assert!(json.get("sellsReport").is_none());
        assert!(json.get("preOrderProblems").is_none());
    }

    #[test]
    fn test_order_report_errors() {
        let mut report = OrderReport {
            placements: vec![
                TradePlacementReport {
                    rate: 990_000,
                    lots: 2,
                    standing_lots: 1,
                    ordered_lots: 1,
                    error: None,
                },
                TradePlacementReport {
                    rate: 980_000,
                    lots: 1,
                    ordered_lots: 1,
                    ..Default::default()
                },
            ],
            error: None,
        };
        assert!(!report.has_errors());
        assert_eq!(report.ordered_lots(), 2);

        report.placements[1].error = Some("insufficient balance".to_string());
        assert!(report.has_errors());
    }

    #[test]
    fn test_trade_placement_skip() {
        assert!(TradePlacement::new(0, 0).is_skip());
        assert!(!TradePlacement::new(990_000, 1).is_skip());
    }
}
