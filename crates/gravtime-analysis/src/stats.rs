//! Summary statistics over the difference column

use std::path::Path;

use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::Serialize;

use gravtime_core::{fixed, round_to, GravtimeResult, SimulationSeries, DIFFERENCE_SCALE};
use gravtime_series::read_series;

/// Max and mean of `differenceNs`, both at 2 fraction digits
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub max: BigDecimal,
    pub mean: BigDecimal,
    /// Records the statistics cover
    pub count: usize,
}

impl Statistics {
    /// The all-zero result for an empty series
    pub fn empty() -> Self {
        Statistics {
            max: round_to(&BigDecimal::zero(), DIFFERENCE_SCALE),
            mean: round_to(&BigDecimal::zero(), DIFFERENCE_SCALE),
            count: 0,
        }
    }

    pub fn max_text(&self) -> String {
        fixed(&self.max, DIFFERENCE_SCALE)
    }

    pub fn mean_text(&self) -> String {
        fixed(&self.mean, DIFFERENCE_SCALE)
    }
}

/// Max and mean of the difference column; an empty series yields zeros
pub fn analyze(series: &SimulationSeries) -> Statistics {
    let mut values = series.iter().map(|r| &r.difference_ns);
    let Some(first) = values.next() else {
        return Statistics::empty();
    };

    let mut max = first;
    let mut sum = first.clone();
    for value in values {
        if value > max {
            max = value;
        }
        sum += value;
    }

    let count = series.len();
    let mean = sum / BigDecimal::from(count as u64);
    Statistics {
        max: round_to(max, DIFFERENCE_SCALE),
        mean: round_to(&mean, DIFFERENCE_SCALE),
        count,
    }
}

/// Read a persisted series and analyze it
pub fn analyze_file(path: impl AsRef<Path>) -> GravtimeResult<Statistics> {
    let series = read_series(path)?;
    let stats = analyze(&series);
    tracing::debug!(
        series = %series.id(),
        count = stats.count,
        max = %stats.max_text(),
        mean = %stats.mean_text(),
        "series analyzed"
    );
    Ok(stats)
}
