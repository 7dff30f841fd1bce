//! Simulation driver - altitude loop implementation

use std::path::{Path, PathBuf};

use bigdecimal::BigDecimal;
use num_traits::Zero;

use gravtime_core::{
    round_to, GravtimeError, GravtimeResult, RunDiagnostics, SeriesId, SimulationConfig,
    SimulationRecord, SimulationSeries, Stage, DIFFERENCE_SCALE, EARTH_TIME_SCALE,
    NANOS_PER_SECOND,
};
use gravtime_physics::{DilationCalculator, QuantumDiscretizer};
use gravtime_precision::{Evaluated, Evaluator, Expr, PrecisionEvaluator};
use gravtime_series::SeriesWriter;

use crate::{CancelToken, DeviceChannel, DeviceRequest, RecordSink};

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every altitude up to the maximum was simulated
    Completed,
    /// Stopped at a checkpoint; the series holds the first `completed_rows`
    Cancelled { completed_rows: usize },
}

/// Result of one run
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Finalized series, complete or a valid prefix
    pub series: SimulationSeries,
    pub diagnostics: RunDiagnostics,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

/// Drives the altitude loop and feeds each record to a sink
pub struct SimulationDriver<E = PrecisionEvaluator> {
    config: SimulationConfig,
    evaluator: E,
    channel: Option<Box<dyn DeviceChannel>>,
    cancel: CancelToken,
}

impl SimulationDriver<PrecisionEvaluator> {
    /// Driver using the in-process decimal engine
    pub fn new(config: SimulationConfig) -> GravtimeResult<Self> {
        Self::with_evaluator(config, PrecisionEvaluator::new())
    }
}

impl<E: Evaluator> SimulationDriver<E> {
    /// Rejects invalid configurations before anything is created
    pub fn with_evaluator(config: SimulationConfig, evaluator: E) -> GravtimeResult<Self> {
        config.validate()?;
        Ok(SimulationDriver {
            config,
            evaluator,
            channel: None,
            cancel: CancelToken::new(),
        })
    }

    /// Report every row's time factor to a device
    pub fn with_channel(mut self, channel: impl DeviceChannel + 'static) -> Self {
        self.channel = Some(Box::new(channel));
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops this driver at its next checkpoint
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run into a new CSV series inside `dir`
    pub fn run_to_dir(&mut self, dir: impl AsRef<Path>) -> GravtimeResult<(RunReport, PathBuf)> {
        let id = SeriesId::now();
        let mut writer = SeriesWriter::create(dir, &id)?.durable(self.config.durable);
        let path = writer.path().to_path_buf();
        let report = self.run_with_id(id, &mut writer)?;
        Ok((report, path))
    }

    /// Run into `sink` under a fresh timestamp id
    pub fn run<S: RecordSink + ?Sized>(&mut self, sink: &mut S) -> GravtimeResult<RunReport> {
        self.run_with_id(SeriesId::now(), sink)
    }

    /// Run the altitude loop
    ///
    /// Evaluation failures and device problems are absorbed and counted.
    /// A sink failure stops the run; rows already persisted stay valid.
    pub fn run_with_id<S: RecordSink + ?Sized>(
        &mut self,
        id: SeriesId,
        sink: &mut S,
    ) -> GravtimeResult<RunReport> {
        let step = u64::try_from(self.config.step)
            .map_err(|_| GravtimeError::input("step must be positive"))?;
        let max_altitude = u64::try_from(self.config.max_altitude)
            .map_err(|_| GravtimeError::input("max altitude must not be negative"))?;

        let dilation = DilationCalculator::new(&self.evaluator, self.config.constants.clone());
        let quantum = QuantumDiscretizer::new(&self.evaluator, self.config.time_quantum.clone())?;

        tracing::info!(
            series = %id,
            step,
            max_altitude,
            rows = self.config.expected_rows(),
            device = self.channel.is_some(),
            "simulation started"
        );

        let mut series = SimulationSeries::new(id);
        let mut diagnostics = RunDiagnostics::new();
        let mut outcome = RunOutcome::Completed;
        let mut altitude: u64 = 0;
        let mut base_time = BigDecimal::zero();
        let mut device_attached = self.channel.is_some();

        while altitude <= max_altitude {
            // Cancellation checkpoint - every earlier row is already persisted
            if self.cancel.is_cancelled() {
                outcome = RunOutcome::Cancelled {
                    completed_rows: series.len(),
                };
                break;
            }

            // Stages 1-4: compute the record
            let record = self.compute_record(altitude, &base_time, &dilation, &quantum, &mut diagnostics);

            // Stage 5: device channel
            if let Some(channel) = self.channel.as_mut().filter(|_| device_attached) {
                let factor = dilation.time_ratio(altitude);
                note(&mut diagnostics, Stage::TimeFactor, &factor);
                device_attached = exchange(
                    channel.as_mut(),
                    DeviceRequest::set_dilation(altitude, factor.value),
                    &mut diagnostics,
                );
            }

            // Stage 6: persist
            let index = series.len();
            sink.append(index, &record)?;
            series.append(record)?;
            diagnostics.rows_written += 1;

            let Some(next) = altitude.checked_add(step) else {
                break;
            };
            altitude = next;
            base_time = self.advance_base(&base_time, &mut diagnostics);
        }

        sink.finalize()?;
        series.finalize();

        match outcome {
            RunOutcome::Completed => tracing::info!(
                series = %series.id(),
                rows = series.len(),
                fallbacks = diagnostics.evaluation_fallbacks,
                clamped = diagnostics.clamped_differences,
                timeouts = diagnostics.channel_timeouts,
                "simulation finished"
            ),
            RunOutcome::Cancelled { completed_rows } => tracing::info!(
                series = %series.id(),
                completed_rows,
                "simulation cancelled"
            ),
        }

        Ok(RunReport {
            series,
            diagnostics,
            outcome,
        })
    }

    fn compute_record(
        &self,
        altitude: u64,
        base_time: &BigDecimal,
        dilation: &DilationCalculator<&E>,
        quantum: &QuantumDiscretizer<&E>,
        diagnostics: &mut RunDiagnostics,
    ) -> SimulationRecord {
        // Stage 1: reference clock
        let offset = &self.config.reference_offset;
        let earth = self.evaluator.evaluate_or(
            &(Expr::from(base_time) + Expr::from(offset)),
            EARTH_TIME_SCALE,
            &round_to(&(base_time + offset), EARTH_TIME_SCALE),
        );
        note(diagnostics, Stage::ReferenceClock, &earth);
        let earth_time = earth.value;

        // Stage 2: dilation
        let dilated = dilation.dilate(altitude, &earth_time);
        note(diagnostics, Stage::Dilation, &dilated);
        let dilated_time = dilated.value;

        // Stage 3: discretization
        let discretized = quantum.discretize(&dilated_time);
        note(diagnostics, Stage::Quantum, &discretized);

        // Stage 4: difference in nanoseconds, never stored negative
        let difference = self.evaluator.evaluate_or(
            &((Expr::from(&dilated_time) - Expr::from(&earth_time)) * Expr::from(NANOS_PER_SECOND)),
            DIFFERENCE_SCALE,
            &BigDecimal::zero(),
        );
        note(diagnostics, Stage::Difference, &difference);
        let mut difference_ns = difference.value;
        if difference_ns < BigDecimal::zero() {
            tracing::debug!(altitude, raw = %difference_ns, "negative difference clamped");
            diagnostics.clamped_differences += 1;
            difference_ns = BigDecimal::zero();
        }

        tracing::debug!(
            altitude,
            earth = %earth_time,
            dilated = %dilated_time,
            difference_ns = %difference_ns,
            "row computed"
        );

        SimulationRecord {
            altitude,
            earth_time,
            dilated_time,
            quantum_time: discretized.value,
            difference_ns,
        }
    }

    /// `base + increment`, or the bare increment if evaluation fails
    fn advance_base(&self, base_time: &BigDecimal, diagnostics: &mut RunDiagnostics) -> BigDecimal {
        let increment = &self.config.base_increment;
        let next = self.evaluator.evaluate_or(
            &(Expr::from(base_time) + Expr::from(increment)),
            EARTH_TIME_SCALE,
            &round_to(increment, EARTH_TIME_SCALE),
        );
        note(diagnostics, Stage::ReferenceClock, &next);
        next.value
    }
}

fn note(diagnostics: &mut RunDiagnostics, stage: Stage, result: &Evaluated) {
    if let Some(err) = &result.degraded {
        tracing::debug!(stage = stage.name(), %err, "fallback value used");
        diagnostics.record_fallback(stage, err.clone());
    }
}

/// One device exchange; returns whether the channel is still worth using
fn exchange(
    channel: &mut dyn DeviceChannel,
    request: DeviceRequest,
    diagnostics: &mut RunDiagnostics,
) -> bool {
    let altitude = request.altitude;
    match channel.send(request) {
        Ok(status) => {
            tracing::debug!(altitude, %status, "device acknowledged");
            true
        }
        Err(GravtimeError::ChannelTimeout(after)) => {
            diagnostics.channel_timeouts += 1;
            tracing::warn!(altitude, ?after, "device did not respond in time");
            true
        }
        Err(err) if err.is_recoverable() => {
            diagnostics.channel_failures += 1;
            tracing::warn!(altitude, %err, "device exchange failed");
            true
        }
        Err(err) => {
            diagnostics.channel_failures += 1;
            tracing::warn!(altitude, %err, "device lost, continuing without it");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, SimulatedDevice, TimedChannel};
    use gravtime_core::{PersistenceFault, PhysicalConstants};
    use gravtime_precision::UnavailableEvaluator;
    use std::str::FromStr;
    use std::time::Duration;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn run_memory<E: Evaluator>(driver: &mut SimulationDriver<E>) -> RunReport {
        let mut sink = MemorySink::new(SeriesId::new("test"));
        driver.run_with_id(SeriesId::new("test"), &mut sink).unwrap()
    }

    #[test]
    fn test_row_count_and_altitudes() {
        let mut driver = SimulationDriver::new(SimulationConfig::new(10_000, 100_000)).unwrap();
        let report = run_memory(&mut driver);
        assert!(report.is_complete());
        assert!(report.series.is_finalized());
        let altitudes: Vec<u64> = report.series.iter().map(|r| r.altitude).collect();
        assert_eq!(altitudes, (0..=100_000).step_by(10_000).collect::<Vec<u64>>());
        assert_eq!(report.diagnostics.rows_written, 11);
        assert!(report.diagnostics.is_clean());
    }

    #[test]
    fn test_reference_clock_steps() {
        let mut driver = SimulationDriver::new(SimulationConfig::new(1, 3)).unwrap();
        let report = run_memory(&mut driver);
        let earth: Vec<String> = report
            .series
            .iter()
            .map(|r| r.earth_time.to_plain_string())
            .collect();
        assert_eq!(earth, ["1.0000000000", "1.1000000000", "1.2000000000", "1.3000000000"]);
    }

    #[test]
    fn test_max_below_step_gives_single_row() {
        let mut driver = SimulationDriver::new(SimulationConfig::new(500, 499)).unwrap();
        assert_eq!(run_memory(&mut driver).series.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            SimulationDriver::new(SimulationConfig::new(0, 10)),
            Err(GravtimeError::Input(_))
        ));
        assert!(matches!(
            SimulationDriver::new(SimulationConfig::new(10, -1)),
            Err(GravtimeError::Input(_))
        ));
    }

    #[test]
    fn test_dense_body_difference_clamped() {
        // Proper time runs slower than the reference, so every raw difference is negative
        let config = SimulationConfig::new(1000, 3000).with_constants(PhysicalConstants::new(
            BigDecimal::from(1000),
            BigDecimal::from(1),
        ));
        let mut driver = SimulationDriver::new(config).unwrap();
        let report = run_memory(&mut driver);
        assert!(report.series.iter().all(|r| r.difference_ns.is_zero()));
        assert_eq!(report.diagnostics.clamped_differences, 3);
        assert!(report.series.records()[1].dilated_time < report.series.records()[1].earth_time);
    }

    #[test]
    fn test_unavailable_engine_degrades_every_stage() {
        let mut driver =
            SimulationDriver::with_evaluator(SimulationConfig::new(10, 20), UnavailableEvaluator).unwrap();
        let report = run_memory(&mut driver);

        assert_eq!(report.series.len(), 3);
        // earth falls back to the native sum, base to the bare increment
        let earth: Vec<BigDecimal> = report.series.iter().map(|r| r.earth_time.clone()).collect();
        assert_eq!(earth, [dec("1"), dec("1.1"), dec("1.1")]);
        for record in &report.series {
            assert_eq!(record.dilated_time, record.earth_time);
            assert_eq!(record.quantum_time, record.earth_time);
            assert!(record.difference_ns.is_zero());
        }
        // 4 per row plus a base advance after each row
        assert_eq!(report.diagnostics.evaluation_fallbacks, 15);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut driver = SimulationDriver::new(SimulationConfig::new(1, 10)).unwrap();
        driver.cancel_token().cancel();
        let report = run_memory(&mut driver);
        assert_eq!(report.outcome, RunOutcome::Cancelled { completed_rows: 0 });
        assert!(report.series.is_empty());
        assert!(report.series.is_finalized());
    }

    struct CancelAfter {
        inner: MemorySink,
        rows: usize,
        token: CancelToken,
    }

    impl RecordSink for CancelAfter {
        fn append(&mut self, index: usize, record: &SimulationRecord) -> GravtimeResult<()> {
            self.inner.append(index, record)?;
            if index + 1 == self.rows {
                self.token.cancel();
            }
            Ok(())
        }

        fn finalize(&mut self) -> GravtimeResult<()> {
            self.inner.finalize()
        }
    }

    #[test]
    fn test_cancel_mid_run_keeps_prefix() {
        let mut driver = SimulationDriver::new(SimulationConfig::new(10, 100)).unwrap();
        let mut sink = CancelAfter {
            inner: MemorySink::new(SeriesId::new("c")),
            rows: 4,
            token: driver.cancel_token(),
        };
        let report = driver.run(&mut sink).unwrap();
        assert_eq!(report.outcome, RunOutcome::Cancelled { completed_rows: 4 });
        assert_eq!(report.series.len(), 4);
        assert_eq!(sink.inner.snapshot().records(), report.series.records());
        assert!(sink.inner.is_finalized());
    }

    struct FailingSink {
        fail_at: usize,
    }

    impl RecordSink for FailingSink {
        fn append(&mut self, index: usize, _record: &SimulationRecord) -> GravtimeResult<()> {
            if index == self.fail_at {
                return Err(GravtimeError::io(
                    index + 1,
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ));
            }
            Ok(())
        }

        fn finalize(&mut self) -> GravtimeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_fatal_with_row() {
        let mut driver = SimulationDriver::new(SimulationConfig::new(10, 100)).unwrap();
        match driver.run(&mut FailingSink { fail_at: 2 }) {
            Err(GravtimeError::Persistence {
                row: 3,
                fault: PersistenceFault::Io(_),
            }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_run_to_dir_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = SimulationDriver::new(SimulationConfig::new(50_000, 100_000)).unwrap();
        let (report, path) = driver.run_to_dir(dir.path()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1 + report.series.len());
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("dilation_series_") && n.ends_with(".csv")));
    }

    struct Silent;

    impl DeviceChannel for Silent {
        fn send(&mut self, _request: DeviceRequest) -> GravtimeResult<String> {
            Err(GravtimeError::ChannelTimeout(Duration::from_millis(1)))
        }
    }

    #[test]
    fn test_channel_timeouts_do_not_abort() {
        let mut quiet = SimulationDriver::new(SimulationConfig::new(10, 40)).unwrap();
        let baseline = run_memory(&mut quiet);

        let mut driver = SimulationDriver::new(SimulationConfig::new(10, 40))
            .unwrap()
            .with_channel(Silent);
        let report = run_memory(&mut driver);
        assert!(report.is_complete());
        assert_eq!(report.diagnostics.channel_timeouts, 5);
        assert_eq!(report.series.records(), baseline.series.records());
    }

    #[test]
    fn test_simulated_device_channel() {
        let channel = TimedChannel::new(SimulatedDevice::new(3), Duration::from_secs(5)).unwrap();
        let mut driver = SimulationDriver::new(SimulationConfig::new(25_000, 100_000))
            .unwrap()
            .with_channel(channel);
        let report = run_memory(&mut driver);
        assert_eq!(report.series.len(), 5);
        assert_eq!(report.diagnostics.channel_timeouts, 0);
        assert_eq!(report.diagnostics.channel_failures, 0);
    }

    struct Unplugged {
        calls: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl DeviceChannel for Unplugged {
        fn send(&mut self, _request: DeviceRequest) -> GravtimeResult<String> {
            self.calls.set(self.calls.get() + 1);
            Err(GravtimeError::ChannelClosed)
        }
    }

    #[test]
    fn test_closed_channel_is_detached_for_the_rest_of_the_run() {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut driver = SimulationDriver::new(SimulationConfig::new(10, 40))
            .unwrap()
            .with_channel(Unplugged { calls: calls.clone() });
        let report = run_memory(&mut driver);
        assert!(report.is_complete());
        assert_eq!(report.series.len(), 5);
        assert_eq!(calls.get(), 1);
        assert_eq!(report.diagnostics.channel_failures, 1);
    }

    #[test]
    fn test_fallback_reference_clock_matches_stored_scale() {
        let mut config = SimulationConfig::new(10, 20);
        config.reference_offset = dec("1.00000000004");
        config.base_increment = dec("0.12345678901");
        let mut driver = SimulationDriver::with_evaluator(config, UnavailableEvaluator).unwrap();
        let report = run_memory(&mut driver);

        let earth: Vec<String> = report
            .series
            .iter()
            .map(|r| r.earth_time.to_plain_string())
            .collect();
        assert_eq!(earth, ["1.0000000000", "1.1234567890", "1.1234567890"]);
        for (i, record) in report.series.iter().enumerate() {
            let reloaded = gravtime_series::parse_row(i + 1, &gravtime_series::format_row(record)).unwrap();
            assert_eq!(&reloaded, record);
        }
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(24))]

        #[test]
        fn prop_row_count_matches_sweep(step in 1i64..500, max in 0i64..2000) {
            let config = SimulationConfig::new(step, max);
            let expected = config.expected_rows();
            let mut driver = SimulationDriver::new(config).unwrap();
            let report = run_memory(&mut driver);
            proptest::prop_assert_eq!(report.series.len() as u64, expected);
            for (i, record) in report.series.iter().enumerate() {
                proptest::prop_assert_eq!(record.altitude, i as u64 * step as u64);
            }
        }
    }
}
