//! Market identification and live market context.
//!
//! A market is a base/quote asset pair on one exchange host. Lot size and
//! rate step can change while a bot is running, so they are stored as
//! atomics and must be read fresh on every cycle.

use crate::error::{CoreError, Result};
use crate::rate::{conventional_rate_to_msg, msg_rate_to_conventional, try_conventional_rate_to_msg};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique market identifier: exchange host plus asset pair.
///
/// Format: `{host}:{base_id}-{quote_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketKey {
    pub host: String,
    pub base_id: u32,
    pub quote_id: u32,
}

impl MarketKey {
    pub fn new(host: impl Into<String>, base_id: u32, quote_id: u32) -> Self {
        Self {
            host: host.into(),
            base_id,
            quote_id,
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.host, self.base_id, self.quote_id)
    }
}

/// Static description of one side of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Asset ID (BIP-44 coin type or token ID).
    pub id: u32,
    /// Ticker symbol, e.g. "dcr".
    pub symbol: String,
    /// Atoms per conventional unit.
    pub unit_factor: u64,
}

impl AssetInfo {
    pub fn new(id: u32, symbol: impl Into<String>, unit_factor: u64) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            unit_factor,
        }
    }

    /// Format an atomic amount in conventional units.
    pub fn fmt_atoms(&self, atoms: u64) -> String {
        let conv = if self.unit_factor == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(atoms) / Decimal::from(self.unit_factor)
        };
        format!("{} {}", conv.normalize(), self.symbol.to_uppercase())
    }
}

/// Live market context shared by the calculator, planner and bot loop.
#[derive(Debug)]
pub struct Market {
    host: String,
    base: AssetInfo,
    quote: AssetInfo,
    name: String,
    lot_size: AtomicU64,
    rate_step: AtomicU64,
}

impl Market {
    /// Create a market context.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidMarket` if a unit factor or the lot size
    /// is zero.
    pub fn new(
        host: impl Into<String>,
        base: AssetInfo,
        quote: AssetInfo,
        lot_size: u64,
        rate_step: u64,
    ) -> Result<Self> {
        if base.unit_factor == 0 || quote.unit_factor == 0 {
            return Err(CoreError::InvalidMarket(format!(
                "zero unit factor for {}/{}",
                base.symbol, quote.symbol
            )));
        }
        if lot_size == 0 {
            return Err(CoreError::InvalidMarket("lot size cannot be zero".to_string()));
        }
        let name = format!("{}_{}", base.symbol.to_lowercase(), quote.symbol.to_lowercase());
        Ok(Self {
            host: host.into(),
            base,
            quote,
            name,
            lot_size: AtomicU64::new(lot_size),
            rate_step: AtomicU64::new(rate_step),
        })
    }

    pub fn key(&self) -> MarketKey {
        MarketKey::new(self.host.clone(), self.base.id, self.quote.id)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Market name, e.g. "dcr_btc".
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_id(&self) -> u32 {
        self.base.id
    }

    pub fn quote_id(&self) -> u32 {
        self.quote.id
    }

    pub fn base(&self) -> &AssetInfo {
        &self.base
    }

    pub fn quote(&self) -> &AssetInfo {
        &self.quote
    }

    /// Current lot size in base atoms.
    #[inline]
    pub fn lot_size(&self) -> u64 {
        self.lot_size.load(Ordering::Acquire)
    }

    pub fn set_lot_size(&self, lot_size: u64) {
        self.lot_size.store(lot_size, Ordering::Release);
    }

    /// Current rate step in message-rate units.
    #[inline]
    pub fn rate_step(&self) -> u64 {
        self.rate_step.load(Ordering::Acquire)
    }

    pub fn set_rate_step(&self, rate_step: u64) {
        self.rate_step.store(rate_step, Ordering::Release);
    }

    /// Convert a conventional rate to a message rate (0 if unrepresentable).
    pub fn msg_rate(&self, conventional: Decimal) -> u64 {
        conventional_rate_to_msg(conventional, self.base.unit_factor, self.quote.unit_factor)
    }

    /// Convert a conventional rate to a message rate, failing if it does not
    /// fit the encoding.
    pub fn try_msg_rate(&self, conventional: Decimal) -> Result<u64> {
        try_conventional_rate_to_msg(conventional, self.base.unit_factor, self.quote.unit_factor)
    }

    /// Convert a message rate to a conventional rate.
    pub fn conventional_rate(&self, msg_rate: u64) -> Decimal {
        msg_rate_to_conventional(msg_rate, self.base.unit_factor, self.quote.unit_factor)
    }

    /// Format a message rate for logs, e.g. "0.005 BTC/DCR".
    pub fn fmt_rate(&self, msg_rate: u64) -> String {
        format!(
            "{} {}/{}",
            self.conventional_rate(msg_rate).normalize(),
            self.quote.symbol.to_uppercase(),
            self.base.symbol.to_uppercase()
        )
    }

    /// Format a base-asset atomic quantity.
    pub fn fmt_base(&self, atoms: u64) -> String {
        self.base.fmt_atoms(atoms)
    }

    /// Format fees that are denominated in base atoms.
    pub fn fmt_base_fees(&self, atoms: u64) -> String {
        format!("{} fees", self.base.fmt_atoms(atoms))
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_market() -> Market {
        Market::new(
            "dex.example.org:7232",
            AssetInfo::new(42, "dcr", 100_000_000),
            AssetInfo::new(0, "btc", 100_000_000),
            100_000_000,
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_market_name_and_key() {
        let market = sample_market();
        assert_eq!(market.name(), "dcr_btc");
        assert_eq!(market.key().to_string(), "dex.example.org:7232:42-0");
        assert_eq!(market.to_string(), "dcr_btc@dex.example.org:7232");
    }

    #[test]
    fn test_live_lot_size_and_rate_step() {
        let market = sample_market();
        assert_eq!(market.lot_size(), 100_000_000);
        market.set_lot_size(50_000_000);
        assert_eq!(market.lot_size(), 50_000_000);

        assert_eq!(market.rate_step(), 100);
        market.set_rate_step(1_000);
        assert_eq!(market.rate_step(), 1_000);
    }

    #[test]
    fn test_rejects_zero_lot_size() {
        let result = Market::new(
            "host",
            AssetInfo::new(42, "dcr", 100_000_000),
            AssetInfo::new(0, "btc", 100_000_000),
            0,
            100,
        );
        assert!(matches!(result, Err(CoreError::InvalidMarket(_))));
    }

    #[test]
    fn test_rate_formatting() {
        let market = sample_market();
        assert_eq!(market.msg_rate(dec!(0.005)), 500_000);
        assert_eq!(market.fmt_rate(500_000), "0.005 BTC/DCR");
        assert_eq!(market.fmt_base(150_000_000), "1.5 DCR");
    }

    #[test]
    fn test_try_msg_rate() {
        let market = sample_market();
        assert_eq!(market.try_msg_rate(dec!(0.005)).unwrap(), 500_000);
        assert!(matches!(
            market.try_msg_rate(dec!(1000000000000)),
            Err(CoreError::InvalidRate(_))
        ));
        assert_eq!(market.msg_rate(dec!(1000000000000)), 0);
    }
}
