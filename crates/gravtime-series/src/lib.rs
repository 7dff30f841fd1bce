//! Gravtime Series - persisted series format
//!
//! One header line followed by one comma-separated row per record, `.` as
//! decimal separator regardless of locale:
//!
//! ```text
//! Altitude(m),Earth_Time(s),Dilated_Time(s),Quantum_Time(s),Difference(ns)
//! 0,1.0000000000,1.0000000000,1.000000000000000,0.00
//! ```
//!
//! Rows are numbered from 1; the header is row 0.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;
