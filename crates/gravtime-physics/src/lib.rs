//! Gravtime Physics - dilation and discretization
//!
//! This crate implements the two per-step calculators:
//! - Dilation: ratio of proper time at altitude to proper time at the surface
//! - Quantization: snapping a continuous time onto a fixed time quantum
//!
//! Both degrade to "return the input unchanged" when evaluation fails, so a
//! simulation step always produces a value.

pub mod dilation;
pub mod quantum;

pub use dilation::*;
pub use quantum::*;
