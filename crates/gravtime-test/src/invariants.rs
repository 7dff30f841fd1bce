//! Series invariants
//!
//! Every check returns human-readable violations rather than panicking so a
//! scenario can report all of them at once.

use bigdecimal::BigDecimal;
use num_traits::Zero;

use gravtime_core::{SimulationConfig, SimulationSeries};

/// Run every check that holds for any series a clean run produces
pub fn check_series(series: &SimulationSeries, config: &SimulationConfig) -> Vec<String> {
    let mut violations = Vec::new();
    violations.extend(properties::altitude_sweep(series, config));
    violations.extend(properties::reference_clock_steps(series, &config.base_increment));
    violations.extend(properties::differences_non_negative(series));
    violations.extend(properties::quantum_bound(series, &config.time_quantum));
    violations
}

/// Individual properties
pub mod properties {
    use super::*;

    /// Altitudes are `0, step, 2*step, ...` and the count is `max / step + 1`
    pub fn altitude_sweep(series: &SimulationSeries, config: &SimulationConfig) -> Vec<String> {
        let mut violations = Vec::new();
        let expected = config.expected_rows();
        if series.len() as u64 != expected {
            violations.push(format!("expected {} rows, found {}", expected, series.len()));
        }
        let step = config.step.max(0) as u64;
        for (i, record) in series.iter().enumerate() {
            let want = i as u64 * step;
            if record.altitude != want {
                violations.push(format!("row {}: altitude {} != {}", i, record.altitude, want));
            }
        }
        violations
    }

    /// Consecutive reference times differ by exactly `increment`
    pub fn reference_clock_steps(series: &SimulationSeries, increment: &BigDecimal) -> Vec<String> {
        series
            .records()
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| {
                let delta = &pair[1].earth_time - &pair[0].earth_time;
                (delta != *increment).then(|| {
                    format!("row {}: earth time advanced by {} not {}", i + 1, delta, increment)
                })
            })
            .collect()
    }

    pub fn differences_non_negative(series: &SimulationSeries) -> Vec<String> {
        series
            .iter()
            .enumerate()
            .filter(|(_, r)| r.difference_ns < BigDecimal::zero())
            .map(|(i, r)| format!("row {}: negative difference {}", i, r.difference_ns))
            .collect()
    }

    /// `differenceNs` never decreases with altitude
    pub fn differences_non_decreasing(series: &SimulationSeries) -> Vec<String> {
        series
            .records()
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1].difference_ns < pair[0].difference_ns)
            .map(|(i, pair)| {
                format!(
                    "row {}: difference fell from {} to {}",
                    i + 1,
                    pair[0].difference_ns,
                    pair[1].difference_ns
                )
            })
            .collect()
    }

    /// `0 <= dilated - quantum < quantum size`
    pub fn quantum_bound(series: &SimulationSeries, quantum: &BigDecimal) -> Vec<String> {
        series
            .iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let gap = &r.dilated_time - &r.quantum_time;
                (gap < BigDecimal::zero() || gap >= *quantum)
                    .then(|| format!("row {}: quantum gap {} outside [0, {})", i, gap, quantum))
            })
            .collect()
    }

    /// Same values at the stored scales
    pub fn same_records(a: &SimulationSeries, b: &SimulationSeries) -> bool {
        a.records() == b.records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravtime_core::{SeriesId, SimulationRecord};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn record(altitude: u64, earth: &str, diff: &str) -> SimulationRecord {
        SimulationRecord {
            altitude,
            earth_time: dec(earth),
            dilated_time: dec(earth),
            quantum_time: dec(earth),
            difference_ns: dec(diff),
        }
    }

    #[test]
    fn test_clean_series_passes() {
        let config = SimulationConfig::new(10, 20);
        let series = SimulationSeries::from_records(
            SeriesId::new("ok"),
            vec![record(0, "1.0", "0"), record(10, "1.1", "0"), record(20, "1.2", "0")],
        )
        .unwrap();
        assert!(check_series(&series, &config).is_empty());
        assert!(properties::differences_non_decreasing(&series).is_empty());
    }

    #[test]
    fn test_violations_reported() {
        let config = SimulationConfig::new(10, 30);
        let series = SimulationSeries::from_records(
            SeriesId::new("bad"),
            vec![record(0, "1.0", "5"), record(10, "1.3", "-1"), record(25, "1.4", "0")],
        )
        .unwrap();
        let violations = check_series(&series, &config);
        // row count, one altitude, one clock step, one negative difference
        assert_eq!(violations.len(), 4, "{violations:?}");
        assert_eq!(properties::differences_non_decreasing(&series).len(), 1);
    }
}
