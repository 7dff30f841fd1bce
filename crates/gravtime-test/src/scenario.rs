//! End-to-end Scenario Suite
//!
//! Runs the driver into a scratch directory, reads the persisted series back
//! and checks it:
//! - Row count and altitude sweep
//! - Reference clock steps
//! - Quantum bound
//! - CSV round trip
//! - Cancellation prefixes

use std::path::PathBuf;
use std::time::Duration;

use bigdecimal::BigDecimal;
use thiserror::Error;

use gravtime_analysis::{analyze, Statistics};
use gravtime_core::{GravtimeError, PhysicalConstants, SeriesId, SimulationConfig, SimulationSeries};
use gravtime_precision::Evaluator;
use gravtime_runtime::{
    CancelToken, RecordSink, RunReport, SimulatedDevice, SimulationDriver, TimedChannel,
};
use gravtime_series::{read_series, SeriesWriter};

use crate::invariants::{check_series, properties};

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Scratch directory: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Pipeline: {0}")]
    Pipeline(#[from] GravtimeError),
}

// ============================================================================
// SCENARIO CONFIGURATION
// ============================================================================

#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub name: &'static str,
    pub simulation: SimulationConfig,
    /// Route every row through a simulated device
    pub with_device: bool,
    /// Cancel after this many rows have been persisted
    pub cancel_after: Option<usize>,
}

impl ScenarioConfig {
    /// Earth, 0 to 100 km in 10 km steps
    pub fn earth_standard() -> Self {
        ScenarioConfig {
            name: "earth-standard",
            simulation: SimulationConfig::new(10_000, 100_000),
            with_device: false,
            cancel_after: None,
        }
    }

    /// Small, very dense body so the dilation shows at 10 digits
    pub fn dense_body() -> Self {
        ScenarioConfig {
            name: "dense-body",
            simulation: SimulationConfig::new(500, 5_000).with_constants(PhysicalConstants::new(
                BigDecimal::from(1_000),
                BigDecimal::from(1),
            )),
            with_device: false,
            cancel_after: None,
        }
    }

    pub fn with_device(mut self) -> Self {
        self.with_device = true;
        self
    }

    pub fn cancelled_after(mut self, rows: usize) -> Self {
        self.cancel_after = Some(rows);
        self
    }
}

// ============================================================================
// RESULT
// ============================================================================

#[derive(Debug)]
pub struct ScenarioResult {
    pub report: RunReport,
    /// Series file written by the run
    pub path: PathBuf,
    /// The same series read back from disk
    pub reloaded: SimulationSeries,
    pub statistics: Statistics,
    pub violations: Vec<String>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn round_trip_exact(&self) -> bool {
        properties::same_records(&self.report.series, &self.reloaded)
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Forwards to a writer and cancels once `rows` rows are on disk
struct CancellingSink {
    writer: SeriesWriter,
    rows: Option<usize>,
    token: CancelToken,
}

impl RecordSink for CancellingSink {
    fn append(&mut self, index: usize, record: &gravtime_core::SimulationRecord) -> gravtime_core::GravtimeResult<()> {
        RecordSink::append(&mut self.writer, index, record)?;
        if self.rows == Some(index + 1) {
            self.token.cancel();
        }
        Ok(())
    }

    fn finalize(&mut self) -> gravtime_core::GravtimeResult<()> {
        RecordSink::finalize(&mut self.writer)
    }
}

pub struct ScenarioHarness {
    config: ScenarioConfig,
    scratch: tempfile::TempDir,
}

impl ScenarioHarness {
    pub fn new(config: ScenarioConfig) -> Result<Self, HarnessError> {
        Ok(ScenarioHarness {
            config,
            scratch: tempfile::tempdir()?,
        })
    }

    pub fn scratch_dir(&self) -> &std::path::Path {
        self.scratch.path()
    }

    /// Run with the in-process engine
    pub fn run(&self) -> Result<ScenarioResult, HarnessError> {
        let driver = SimulationDriver::new(self.config.simulation.clone())?;
        self.run_driver(driver)
    }

    /// Run with a caller-supplied evaluator
    pub fn run_with<E: Evaluator>(&self, evaluator: E) -> Result<ScenarioResult, HarnessError> {
        let driver = SimulationDriver::with_evaluator(self.config.simulation.clone(), evaluator)?;
        self.run_driver(driver)
    }

    fn run_driver<E: Evaluator>(&self, mut driver: SimulationDriver<E>) -> Result<ScenarioResult, HarnessError> {
        if self.config.with_device {
            let channel = TimedChannel::new(SimulatedDevice::new(42), Duration::from_secs(5))?;
            driver = driver.with_channel(channel);
        }

        let id = SeriesId::new(self.config.name);
        let writer = SeriesWriter::create(self.scratch.path(), &id)?;
        let path = writer.path().to_path_buf();
        let mut sink = CancellingSink {
            writer,
            rows: self.config.cancel_after,
            token: driver.cancel_token(),
        };

        let report = driver.run_with_id(id, &mut sink)?;
        let reloaded = read_series(&path)?;
        let statistics = analyze(&reloaded);

        let mut violations = if self.config.cancel_after.is_some() {
            Vec::new()
        } else {
            check_series(&reloaded, &self.config.simulation)
        };
        if !properties::same_records(&report.series, &reloaded) {
            violations.push("persisted series differs from the in-memory series".to_string());
        }

        Ok(ScenarioResult {
            report,
            path,
            reloaded,
            statistics,
            violations,
        })
    }
}

pub fn scenario_earth_standard() -> Result<ScenarioResult, HarnessError> {
    ScenarioHarness::new(ScenarioConfig::earth_standard())?.run()
}

pub fn scenario_dense_body() -> Result<ScenarioResult, HarnessError> {
    ScenarioHarness::new(ScenarioConfig::dense_body())?.run()
}
