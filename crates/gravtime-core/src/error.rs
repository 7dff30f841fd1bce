//! Error types for the gravtime pipeline

use std::time::Duration;

use thiserror::Error;

/// Arithmetic evaluation failures.
///
/// These never escape a simulation run: every caller substitutes its own
/// fallback value and the run continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Square root of negative operand: {0}")]
    NegativeSqrt(String),

    #[error("Malformed operand: {0:?}")]
    MalformedOperand(String),

    #[error("Malformed expression at {position}: {reason}")]
    MalformedExpression { position: usize, reason: String },

    #[error("Result out of range: {0}")]
    OutOfRange(String),

    #[error("Evaluation engine unavailable")]
    EngineUnavailable,
}

/// Result type for arithmetic evaluation
pub type EvalResult<T> = Result<T, EvaluationError>;

/// What went wrong while appending to or reading a persisted series
#[derive(Error, Debug)]
pub enum PersistenceFault {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected header: {0:?}")]
    Header(String),

    #[error("Expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Invalid value {value:?} in column {column}")]
    Field { column: &'static str, value: String },

    #[error("Writer already finalized")]
    Closed,
}

/// Core gravtime errors
#[derive(Error, Debug)]
pub enum GravtimeError {
    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    /// Fatal for the current run; rows before `row` remain valid.
    #[error("Persistence failed at row {row}: {fault}")]
    Persistence {
        row: usize,
        #[source]
        fault: PersistenceFault,
    },

    #[error("Device channel timed out after {0:?}")]
    ChannelTimeout(Duration),

    #[error("Device channel closed")]
    ChannelClosed,

    #[error("Device error: {0}")]
    Device(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Series {0} is finalized")]
    SeriesFinalized(String),

    #[error("Altitude must strictly increase: {previous} then {next}")]
    SeriesOrder { previous: u64, next: u64 },
}

impl GravtimeError {
    /// Shorthand for an I/O failure at a given row
    pub fn io(row: usize, err: std::io::Error) -> Self {
        GravtimeError::Persistence {
            row,
            fault: PersistenceFault::Io(err),
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        GravtimeError::Input(msg.into())
    }

    /// Whether the run can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GravtimeError::Evaluation(_)
                | GravtimeError::ChannelTimeout(_)
                | GravtimeError::Device(_)
        )
    }
}

/// Result type for gravtime operations
pub type GravtimeResult<T> = Result<T, GravtimeError>;
