//! Run diagnostics
//!
//! Numeric degradation is silent in the data; these counters make it visible.

use crate::EvaluationError;

/// Pipeline stage that substituted a fallback value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    ReferenceClock,
    Dilation,
    Quantum,
    Difference,
    TimeFactor,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::ReferenceClock => "reference_clock",
            Stage::Dilation => "dilation",
            Stage::Quantum => "quantum",
            Stage::Difference => "difference",
            Stage::TimeFactor => "time_factor",
        }
    }
}

/// Counters collected over one simulation run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunDiagnostics {
    /// Evaluations that fell back to the caller's value
    pub evaluation_fallbacks: u64,
    /// Negative differences stored as zero
    pub clamped_differences: u64,
    /// Device exchanges that hit the bounded wait
    pub channel_timeouts: u64,
    /// Device exchanges that failed for any other reason
    pub channel_failures: u64,
    /// Rows persisted by the sink
    pub rows_written: u64,
    /// Most recent fallback
    pub last_fallback: Option<(Stage, EvaluationError)>,
}

impl RunDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fallback(&mut self, stage: Stage, err: EvaluationError) {
        self.evaluation_fallbacks += 1;
        self.last_fallback = Some((stage, err));
    }

    /// True when every value in the run came from a successful evaluation
    pub fn is_clean(&self) -> bool {
        self.evaluation_fallbacks == 0
    }
}
