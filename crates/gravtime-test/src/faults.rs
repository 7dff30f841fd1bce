//! Fault-injecting evaluators

use std::cell::Cell;

use bigdecimal::BigDecimal;

use gravtime_core::{EvalResult, EvaluationError};
use gravtime_precision::{Evaluator, Expr, PrecisionEvaluator};

/// Fails every `period`-th evaluation, delegating the rest
#[derive(Debug)]
pub struct FlakyEvaluator {
    inner: PrecisionEvaluator,
    period: usize,
    calls: Cell<usize>,
    failures: Cell<usize>,
}

impl FlakyEvaluator {
    /// `period` of 0 never fails
    pub fn new(period: usize) -> Self {
        FlakyEvaluator {
            inner: PrecisionEvaluator::new(),
            period,
            calls: Cell::new(0),
            failures: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Evaluations that were made to fail
    pub fn failures(&self) -> usize {
        self.failures.get()
    }
}

impl Evaluator for FlakyEvaluator {
    fn evaluate(&self, expr: &Expr, scale: i64) -> EvalResult<BigDecimal> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.period != 0 && call % self.period == 0 {
            self.failures.set(self.failures.get() + 1);
            return Err(EvaluationError::EngineUnavailable);
        }
        self.inner.evaluate(expr, scale)
    }
}

/// Fails only expressions whose text contains `needle`
#[derive(Debug)]
pub struct SelectiveEvaluator {
    inner: PrecisionEvaluator,
    needle: String,
}

impl SelectiveEvaluator {
    pub fn new(needle: impl Into<String>) -> Self {
        SelectiveEvaluator {
            inner: PrecisionEvaluator::new(),
            needle: needle.into(),
        }
    }
}

impl Evaluator for SelectiveEvaluator {
    fn evaluate(&self, expr: &Expr, scale: i64) -> EvalResult<BigDecimal> {
        if expr.to_string().contains(&self.needle) {
            return Err(EvaluationError::EngineUnavailable);
        }
        self.inner.evaluate(expr, scale)
    }
}
