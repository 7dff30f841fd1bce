//! Run configuration and physical constants
//!
//! Configuration is an immutable value handed to the driver at construction;
//! nothing in the pipeline reads global state.

use std::path::Path;
use std::time::Duration;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::{fraction_digits, GravtimeError, GravtimeResult, QUANTUM_TIME_SCALE};

/// Constants of the modeled body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Radius of the reference surface (meters)
    pub planet_radius: BigDecimal,
    /// Schwarzschild radius of the body (meters)
    pub schwarzschild_radius: BigDecimal,
}

impl PhysicalConstants {
    pub fn new(planet_radius: BigDecimal, schwarzschild_radius: BigDecimal) -> Self {
        PhysicalConstants {
            planet_radius,
            schwarzschild_radius,
        }
    }

    /// Earth: R = 6371000 m, Rs = 0.0089 m
    pub fn earth() -> Self {
        Self::new(
            BigDecimal::from(6_371_000u32),
            BigDecimal::new(BigInt::from(89), 4),
        )
    }

    /// Weak-field model only holds for `0 < Rs < R`
    pub fn validate(&self) -> GravtimeResult<()> {
        if self.planet_radius <= BigDecimal::zero() {
            return Err(GravtimeError::input("planet radius must be positive"));
        }
        if self.schwarzschild_radius <= BigDecimal::zero() {
            return Err(GravtimeError::input("Schwarzschild radius must be positive"));
        }
        if self.schwarzschild_radius >= self.planet_radius {
            return Err(GravtimeError::input(
                "Schwarzschild radius must be smaller than the planet radius",
            ));
        }
        Ok(())
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self::earth()
    }
}

/// Check that a time quantum is usable by the discretizer.
///
/// The quantum must be positive and fit in the discretized column's scale,
/// otherwise `units * quantum` cannot be stored exactly.
pub fn validate_quantum(quantum: &BigDecimal) -> GravtimeResult<()> {
    if *quantum <= BigDecimal::zero() {
        return Err(GravtimeError::input("time quantum must be positive"));
    }
    if fraction_digits(quantum) > QUANTUM_TIME_SCALE {
        return Err(GravtimeError::Input(format!(
            "time quantum {} has more than {} fraction digits",
            quantum, QUANTUM_TIME_SCALE
        )));
    }
    Ok(())
}

/// Simulation run configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Altitude increment per iteration (meters)
    pub step: i64,
    /// Highest altitude simulated, inclusive (meters)
    pub max_altitude: i64,
    /// Body constants
    pub constants: PhysicalConstants,
    /// Minimal time unit for discretization (seconds)
    pub time_quantum: BigDecimal,
    /// Reference clock advance per iteration (seconds)
    pub base_increment: BigDecimal,
    /// Offset added to the accumulated base time to form the reference clock
    pub reference_offset: BigDecimal,
    /// Bounded wait for the device channel
    pub channel_timeout_ms: u64,
    /// Sync every persisted row to disk, not just flush it
    pub durable: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            step: 10_000,
            max_altitude: 100_000,
            constants: PhysicalConstants::earth(),
            time_quantum: BigDecimal::new(BigInt::from(1), 12),
            base_increment: BigDecimal::new(BigInt::from(1), 1),
            reference_offset: BigDecimal::from(1),
            channel_timeout_ms: 250,
            durable: false,
        }
    }
}

impl SimulationConfig {
    /// Default configuration with a custom altitude sweep
    pub fn new(step: i64, max_altitude: i64) -> Self {
        SimulationConfig {
            step,
            max_altitude,
            ..Default::default()
        }
    }

    pub fn with_constants(mut self, constants: PhysicalConstants) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_time_quantum(mut self, quantum: BigDecimal) -> Self {
        self.time_quantum = quantum;
        self
    }

    pub fn with_channel_timeout(mut self, timeout: Duration) -> Self {
        self.channel_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Reject configurations that must not start a run
    pub fn validate(&self) -> GravtimeResult<()> {
        if self.step <= 0 {
            return Err(GravtimeError::Input(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if self.max_altitude < 0 {
            return Err(GravtimeError::Input(format!(
                "max altitude must not be negative, got {}",
                self.max_altitude
            )));
        }
        if self.base_increment <= BigDecimal::zero() {
            return Err(GravtimeError::input("base increment must be positive"));
        }
        if self.reference_offset <= BigDecimal::zero() {
            return Err(GravtimeError::input("reference offset must be positive"));
        }
        self.constants.validate()?;
        validate_quantum(&self.time_quantum)
    }

    /// Number of records a complete run produces: `max / step + 1`
    pub fn expected_rows(&self) -> u64 {
        if self.step <= 0 || self.max_altitude < 0 {
            return 0;
        }
        (self.max_altitude / self.step) as u64 + 1
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> GravtimeResult<Self> {
        let config: SimulationConfig = serde_json::from_str(json)
            .map_err(|e| GravtimeError::Input(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> GravtimeResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            GravtimeError::Input(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}
