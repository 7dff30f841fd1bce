//! Gravtime Analysis - read-only views over a finished series
//!
//! Nothing here mutates a series; the analyzer can run at any time after (or
//! during) a run against the persisted file.

pub mod projection;
pub mod stats;

pub use projection::*;
pub use stats::*;
