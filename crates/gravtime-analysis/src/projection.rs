//! Display projection
//!
//! Maps each record to an altitude in kilometers, its difference clamped into
//! `[0, scale_max]`, and a bar length proportional to that difference. This is
//! all a renderer needs; it never sees the series itself.

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;

use gravtime_core::{GravtimeError, GravtimeResult, SimulationSeries};

/// One bar of the projection
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectedBar {
    /// Altitude in kilometers, exact
    pub altitude_km: BigDecimal,
    /// Difference clamped into `[0, scale_max]`
    pub difference_ns: BigDecimal,
    /// `floor(difference / scale_max * width)`, at most `width`
    pub bar_len: usize,
}

/// Project a series for display against a fixed scale
pub fn project(
    series: &SimulationSeries,
    scale_max: &BigDecimal,
    width: usize,
) -> GravtimeResult<Vec<ProjectedBar>> {
    if *scale_max <= BigDecimal::zero() {
        return Err(GravtimeError::Input(format!(
            "scale maximum must be positive, got {}",
            scale_max
        )));
    }
    if width == 0 {
        return Err(GravtimeError::input("bar width must be at least 1"));
    }

    let zero = BigDecimal::zero();
    let full = BigDecimal::from(width as u64);

    let bars = series
        .iter()
        .map(|record| {
            let clamped = if record.difference_ns < zero {
                zero.clone()
            } else if record.difference_ns > *scale_max {
                scale_max.clone()
            } else {
                record.difference_ns.clone()
            };

            let bar_len = (&clamped * &full / scale_max)
                .with_scale_round(0, RoundingMode::Down)
                .to_usize()
                .unwrap_or(width)
                .min(width);

            ProjectedBar {
                altitude_km: BigDecimal::new(BigInt::from(record.altitude), 3),
                difference_ns: clamped,
                bar_len,
            }
        })
        .collect();

    Ok(bars)
}

/// Smallest scale that fits every difference, or 1 if all are zero
pub fn auto_scale(series: &SimulationSeries) -> BigDecimal {
    series
        .iter()
        .map(|r| &r.difference_ns)
        .filter(|d| **d > BigDecimal::zero())
        .max()
        .cloned()
        .unwrap_or_else(|| BigDecimal::from(1))
}
