//! Gravtime Test Harness - Scenario runs and pipeline validation
//!
//! This crate provides:
//! - End-to-end scenario runs against a scratch directory
//! - Series invariant checks
//! - Fault-injecting evaluators
//! - Seeded expression fuzzing

pub mod expr_fuzzer;
pub mod faults;
pub mod invariants;
pub mod scenario;

pub use expr_fuzzer::*;
pub use faults::*;
pub use invariants::*;
pub use scenario::*;
