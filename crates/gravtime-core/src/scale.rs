//! Decimal scales (fraction digits) used across the pipeline

use bigdecimal::{BigDecimal, RoundingMode};

/// Scale of the reference clock column
pub const EARTH_TIME_SCALE: i64 = 10;

/// Scale of the dilated time column
pub const DILATED_TIME_SCALE: i64 = 10;

/// Scale of the discretized time column
pub const QUANTUM_TIME_SCALE: i64 = 15;

/// Scale of the nanosecond difference column
pub const DIFFERENCE_SCALE: i64 = 2;

/// Scale of the time factor sent to the device channel
pub const TIME_FACTOR_SCALE: i64 = 15;

/// Minimum fraction digits carried by division and square root.
///
/// `Rs/R` and `Rs/(R + h)` first differ around the 10th decimal place, so
/// anything below ~15 digits flattens the signal to zero.
pub const WORKING_SCALE: i64 = 40;

/// Nanoseconds per second
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Round half-up to `scale` fraction digits
#[inline]
pub fn round_to(value: &BigDecimal, scale: i64) -> BigDecimal {
    value.with_scale_round(scale, RoundingMode::HalfUp)
}

/// Render with exactly `scale` fraction digits and `.` as separator
pub fn fixed(value: &BigDecimal, scale: i64) -> String {
    round_to(value, scale).to_plain_string()
}

/// Number of fraction digits actually needed to represent `value`
pub fn fraction_digits(value: &BigDecimal) -> i64 {
    let (_, exponent) = value.normalized().as_bigint_and_exponent();
    exponent.max(0)
}
