//! Gravtime Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every stage of the pipeline:
//! - Simulation records and series
//! - Decimal scales used for computation and storage
//! - Physical constants and run configuration
//! - Error taxonomy and run diagnostics

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod record;
pub mod scale;

pub use config::*;
pub use diagnostics::*;
pub use error::*;
pub use record::*;
pub use scale::*;
