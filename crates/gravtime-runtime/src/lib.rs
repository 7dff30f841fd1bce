//! Gravtime Runtime - Simulation driver
//!
//! Each iteration of the altitude loop runs the same stages:
//! 1. Advance the reference clock
//! 2. Dilate it for the current altitude
//! 3. Discretize the dilated time
//! 4. Difference in nanoseconds (clamped at zero)
//! 5. Report the time factor to the device channel (optional, bounded wait)
//! 6. Persist the record
//! 7. Cancellation checkpoint

pub mod cancel;
pub mod channel;
pub mod driver;
pub mod sink;

pub use cancel::*;
pub use channel::*;
pub use driver::*;
pub use sink::*;
