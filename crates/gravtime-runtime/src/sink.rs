//! Record sinks
//!
//! A sink receives each record as soon as the driver has computed it.

use std::sync::Arc;

use parking_lot::RwLock;

use gravtime_core::{GravtimeResult, SeriesId, SimulationRecord, SimulationSeries};
use gravtime_series::SeriesWriter;

/// Destination for records produced by a run
pub trait RecordSink {
    /// Persist the record at 0-based position `index`
    fn append(&mut self, index: usize, record: &SimulationRecord) -> GravtimeResult<()>;

    /// Close the sink; no further appends are accepted
    fn finalize(&mut self) -> GravtimeResult<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn append(&mut self, index: usize, record: &SimulationRecord) -> GravtimeResult<()> {
        (**self).append(index, record)
    }

    fn finalize(&mut self) -> GravtimeResult<()> {
        (**self).finalize()
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn append(&mut self, index: usize, record: &SimulationRecord) -> GravtimeResult<()> {
        (**self).append(index, record)
    }

    fn finalize(&mut self) -> GravtimeResult<()> {
        (**self).finalize()
    }
}

impl RecordSink for SeriesWriter {
    fn append(&mut self, index: usize, record: &SimulationRecord) -> GravtimeResult<()> {
        SeriesWriter::append(self, record)?;
        tracing::trace!(index, altitude = record.altitude, "row persisted");
        Ok(())
    }

    fn finalize(&mut self) -> GravtimeResult<()> {
        SeriesWriter::finalize(self)
    }
}

/// In-memory sink whose series can be read while the run is in progress
#[derive(Clone, Debug)]
pub struct MemorySink {
    series: Arc<RwLock<SimulationSeries>>,
}

impl MemorySink {
    pub fn new(id: SeriesId) -> Self {
        MemorySink {
            series: Arc::new(RwLock::new(SimulationSeries::new(id))),
        }
    }

    /// Copy of everything appended so far
    pub fn snapshot(&self) -> SimulationSeries {
        self.series.read().clone()
    }

    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.series.read().is_finalized()
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, index: usize, record: &SimulationRecord) -> GravtimeResult<()> {
        self.series.write().append(record.clone())?;
        tracing::trace!(index, altitude = record.altitude, "row buffered");
        Ok(())
    }

    fn finalize(&mut self) -> GravtimeResult<()> {
        self.series.write().finalize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use gravtime_core::GravtimeError;

    fn record(altitude: u64) -> SimulationRecord {
        let one = BigDecimal::from(1);
        SimulationRecord {
            altitude,
            earth_time: one.clone(),
            dilated_time: one.clone(),
            quantum_time: one,
            difference_ns: BigDecimal::from(0),
        }
    }

    #[test]
    fn test_memory_sink_shared_snapshot() {
        let mut sink = MemorySink::new(SeriesId::new("mem"));
        let observer = sink.clone();
        sink.append(0, &record(0)).unwrap();
        sink.append(1, &record(10)).unwrap();
        assert_eq!(observer.len(), 2);
        assert!(!observer.snapshot().is_finalized());

        sink.finalize().unwrap();
        assert!(observer.is_finalized());
        assert!(matches!(
            sink.append(2, &record(20)),
            Err(GravtimeError::SeriesFinalized(_))
        ));
    }

    #[test]
    fn test_boxed_writer_sink() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SeriesWriter::create(dir.path(), &SeriesId::new("boxed")).unwrap();
        let path = writer.path().to_path_buf();
        let mut sink: Box<dyn RecordSink> = Box::new(writer);
        sink.append(0, &record(0)).unwrap();
        sink.finalize().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 2);
    }
}
