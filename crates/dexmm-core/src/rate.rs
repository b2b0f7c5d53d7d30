//! Message-rate encoding and rate-step quantization.
//!
//! Rates travel as unsigned integers: quote atoms per base atom, scaled by
//! [`RATE_ENCODING_FACTOR`]. Conventional rates (quote units per base unit)
//! are handled as `Decimal` to avoid floating point drift when converting.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{CoreError, Result};

/// Scaling factor between an atomic ratio and its message-rate encoding.
pub const RATE_ENCODING_FACTOR: u64 = 100_000_000;

/// Quantize `rate` to the nearest multiple of `step`.
///
/// A zero rate stays zero regardless of step, so that "no rate" is never
/// promoted to one step. A nonzero rate smaller than half a step rounds up
/// to one step rather than collapsing to zero. A step of zero leaves the
/// rate untouched.
pub fn stepped_rate(rate: u64, step: u64) -> u64 {
    if rate == 0 {
        return 0;
    }
    if step == 0 {
        return rate;
    }
    let remainder = rate % step;
    let mut steps = rate / step;
    // 2 * remainder >= step, written to avoid overflow
    if remainder >= step - remainder {
        steps += 1;
    }
    // rounding up past u64::MAX falls back to the step below
    steps.max(1).checked_mul(step).unwrap_or(rate - remainder)
}

/// Convert a message rate to a conventional rate.
///
/// `base_factor` and `quote_factor` are the number of atoms in one
/// conventional unit of the respective asset.
pub fn msg_rate_to_conventional(msg_rate: u64, base_factor: u64, quote_factor: u64) -> Decimal {
    if quote_factor == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(msg_rate) / Decimal::from(RATE_ENCODING_FACTOR) * Decimal::from(base_factor)
        / Decimal::from(quote_factor)
}

/// Convert a conventional rate to a message rate.
///
/// Non-positive rates encode as 0. Fails if `base_factor` is zero or the
/// result does not fit a `u64`.
pub fn try_conventional_rate_to_msg(
    rate: Decimal,
    base_factor: u64,
    quote_factor: u64,
) -> Result<u64> {
    if base_factor == 0 {
        return Err(CoreError::InvalidRate("base unit factor is zero".to_string()));
    }
    if rate <= Decimal::ZERO {
        return Ok(0);
    }
    rate.checked_mul(Decimal::from(quote_factor))
        .and_then(|r| r.checked_div(Decimal::from(base_factor)))
        .and_then(|r| r.checked_mul(Decimal::from(RATE_ENCODING_FACTOR)))
        .and_then(|r| r.round().to_u64())
        .ok_or_else(|| CoreError::InvalidRate(format!("{rate} overflows the message rate encoding")))
}

/// Lossy form of [`try_conventional_rate_to_msg`]: 0 on any failure.
pub fn conventional_rate_to_msg(rate: Decimal, base_factor: u64, quote_factor: u64) -> u64 {
    try_conventional_rate_to_msg(rate, base_factor, quote_factor).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stepped_rate_zero_is_zero() {
        assert_eq!(stepped_rate(0, 1), 0);
        assert_eq!(stepped_rate(0, 1_000), 0);
        assert_eq!(stepped_rate(0, 0), 0);
    }

    #[test]
    fn test_stepped_rate_nearest_multiple() {
        assert_eq!(stepped_rate(1_049, 100), 1_000);
        assert_eq!(stepped_rate(1_050, 100), 1_100);
        assert_eq!(stepped_rate(1_051, 100), 1_100);
        assert_eq!(stepped_rate(1_000, 100), 1_000);
        assert_eq!(stepped_rate(495_000, 1), 495_000);
    }

    #[test]
    fn test_stepped_rate_below_half_step_is_one_step() {
        assert_eq!(stepped_rate(10, 100), 100);
    }

    #[test]
    fn test_stepped_rate_zero_step_passthrough() {
        assert_eq!(stepped_rate(12_345, 0), 12_345);
    }

    #[test]
    fn test_stepped_rate_large_values_do_not_overflow() {
        let step = 1_000;
        let rate = u64::MAX - 10;
        assert_eq!(stepped_rate(rate, step) % step, 0);
    }

    #[test]
    fn test_conventional_conversion() {
        // 1e8 atoms per unit on both sides: 0.005 quote/base
        let msg = conventional_rate_to_msg(dec!(0.005), 100_000_000, 100_000_000);
        assert_eq!(msg, 500_000);
        assert_eq!(
            msg_rate_to_conventional(msg, 100_000_000, 100_000_000),
            dec!(0.005)
        );
    }

    #[test]
    fn test_conventional_conversion_unit_factors() {
        // base has 1e8 atoms, quote 1e6 atoms (e.g. a 6-decimal token)
        let msg = conventional_rate_to_msg(dec!(20), 100_000_000, 1_000_000);
        assert_eq!(msg, 20_000_000);
        assert_eq!(msg_rate_to_conventional(msg, 100_000_000, 1_000_000), dec!(20));
    }

    #[test]
    fn test_conventional_conversion_rejects_non_positive() {
        assert_eq!(conventional_rate_to_msg(Decimal::ZERO, 1, 1), 0);
        assert_eq!(conventional_rate_to_msg(dec!(-1), 1, 1), 0);
        assert_eq!(conventional_rate_to_msg(dec!(1), 0, 1), 0);
    }

    #[test]
    fn test_try_conventional_conversion_overflow() {
        // 1e12 quote/base encodes past u64::MAX
        assert!(matches!(
            try_conventional_rate_to_msg(dec!(1000000000000), 100_000_000, 100_000_000),
            Err(CoreError::InvalidRate(_))
        ));
        assert_eq!(
            conventional_rate_to_msg(dec!(1000000000000), 100_000_000, 100_000_000),
            0
        );
        assert!(matches!(
            try_conventional_rate_to_msg(Decimal::MAX, 1, 1),
            Err(CoreError::InvalidRate(_))
        ));
        assert!(matches!(
            try_conventional_rate_to_msg(dec!(1), 0, 1),
            Err(CoreError::InvalidRate(_))
        ));
        assert_eq!(try_conventional_rate_to_msg(dec!(-1), 1, 1).unwrap(), 0);
    }
}
