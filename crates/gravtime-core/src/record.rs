//! Simulation records and series
//!
//! A series is the ordered, append-only output of one simulation run:
//! created empty, appended once per altitude step, then finalized.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Local};

use crate::{GravtimeError, GravtimeResult};

/// Column header of the persisted series
pub const SERIES_HEADER: &str =
    "Altitude(m),Earth_Time(s),Dilated_Time(s),Quantum_Time(s),Difference(ns)";

/// One row of a simulation series
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationRecord {
    /// Altitude above the reference surface (meters)
    pub altitude: u64,
    /// Reference clock reading (seconds)
    pub earth_time: BigDecimal,
    /// Proper time at altitude (seconds)
    pub dilated_time: BigDecimal,
    /// Dilated time snapped to the time quantum (seconds)
    pub quantum_time: BigDecimal,
    /// `(dilated - earth) * 1e9`, clamped to >= 0 (nanoseconds)
    pub difference_ns: BigDecimal,
}

/// Series identifier - the creation timestamp
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SeriesId(String);

impl SeriesId {
    /// Timestamp format used in ids and file names
    pub const FORMAT: &'static str = "%Y%m%d_%H%M%S";

    pub fn from_timestamp(at: DateTime<Local>) -> Self {
        SeriesId(at.format(Self::FORMAT).to_string())
    }

    pub fn now() -> Self {
        Self::from_timestamp(Local::now())
    }

    /// Wrap an existing identifier (e.g. one recovered from a file name)
    pub fn new(id: impl Into<String>) -> Self {
        SeriesId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, append-only sequence of records from one run
#[derive(Clone, Debug)]
pub struct SimulationSeries {
    id: SeriesId,
    records: Vec<SimulationRecord>,
    finalized: bool,
}

impl SimulationSeries {
    /// Create an empty, open series
    pub fn new(id: SeriesId) -> Self {
        SimulationSeries {
            id,
            records: Vec::new(),
            finalized: false,
        }
    }

    /// Build a finalized series from records already in altitude order
    pub fn from_records(id: SeriesId, records: Vec<SimulationRecord>) -> GravtimeResult<Self> {
        let mut series = Self::new(id);
        for record in records {
            series.append(record)?;
        }
        series.finalize();
        Ok(series)
    }

    /// Append the next record
    ///
    /// Altitude must be strictly greater than the previous record's.
    pub fn append(&mut self, record: SimulationRecord) -> GravtimeResult<()> {
        if self.finalized {
            return Err(GravtimeError::SeriesFinalized(self.id.to_string()));
        }
        if let Some(last) = self.records.last() {
            if record.altitude <= last.altitude {
                return Err(GravtimeError::SeriesOrder {
                    previous: last.altitude,
                    next: record.altitude,
                });
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// Close the series for writes
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn id(&self) -> &SeriesId {
        &self.id
    }

    pub fn records(&self) -> &[SimulationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimulationRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&SimulationRecord> {
        self.records.last()
    }

    /// Finalized copy of the first `len` records
    pub fn prefix(&self, len: usize) -> SimulationSeries {
        let mut series = SimulationSeries {
            id: self.id.clone(),
            records: self.records[..len.min(self.records.len())].to_vec(),
            finalized: false,
        };
        series.finalize();
        series
    }
}

impl<'a> IntoIterator for &'a SimulationSeries {
    type Item = &'a SimulationRecord;
    type IntoIter = std::slice::Iter<'a, SimulationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn record(altitude: u64) -> SimulationRecord {
        SimulationRecord {
            altitude,
            earth_time: BigDecimal::from(1),
            dilated_time: BigDecimal::from(1),
            quantum_time: BigDecimal::from(1),
            difference_ns: BigDecimal::from(0),
        }
    }

    #[test]
    fn test_series_id_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(SeriesId::from_timestamp(at).as_str(), "20240309_140507");
    }

    #[test]
    fn test_append_requires_increasing_altitude() {
        let mut series = SimulationSeries::new(SeriesId::new("t"));
        series.append(record(0)).unwrap();
        series.append(record(10)).unwrap();

        let err = series.append(record(10)).unwrap_err();
        assert!(matches!(
            err,
            GravtimeError::SeriesOrder { previous: 10, next: 10 }
        ));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_finalized_series_rejects_append() {
        let mut series = SimulationSeries::new(SeriesId::new("t"));
        series.append(record(0)).unwrap();
        series.finalize();

        assert!(matches!(
            series.append(record(5)),
            Err(GravtimeError::SeriesFinalized(_))
        ));
    }

    #[test]
    fn test_prefix_is_finalized() {
        let series = SimulationSeries::from_records(
            SeriesId::new("t"),
            vec![record(0), record(1), record(2)],
        )
        .unwrap();

        let prefix = series.prefix(2);
        assert_eq!(prefix.len(), 2);
        assert!(prefix.is_finalized());
        assert_eq!(prefix.last().map(|r| r.altitude), Some(1));
        assert_eq!(series.prefix(10).len(), 3);
    }

    proptest! {
        #[test]
        fn prop_append_keeps_altitudes_increasing(altitudes in prop::collection::vec(0u64..1_000, 0..40)) {
            let mut series = SimulationSeries::new(SeriesId::new("p"));
            for altitude in altitudes {
                let previous = series.last().map(|r| r.altitude);
                let accepted = series.append(record(altitude)).is_ok();
                prop_assert_eq!(accepted, previous.map_or(true, |p| altitude > p));
            }
            let stored: Vec<u64> = series.iter().map(|r| r.altitude).collect();
            prop_assert!(stored.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
