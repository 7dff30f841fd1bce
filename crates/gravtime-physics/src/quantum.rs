//! Time quantization
//!
//! Snaps a continuous time onto the largest multiple of a fixed quantum not
//! exceeding it: `floor(t / quantum) * quantum`.

use bigdecimal::BigDecimal;

use gravtime_core::{validate_quantum, EvalResult, GravtimeResult, QUANTUM_TIME_SCALE};
use gravtime_precision::{Evaluated, Evaluator, Expr};

/// Discretizes continuous time values onto a fixed quantum
#[derive(Clone, Debug)]
pub struct QuantumDiscretizer<E> {
    evaluator: E,
    quantum: BigDecimal,
}

impl<E: Evaluator> QuantumDiscretizer<E> {
    /// The quantum must be positive and have at most 15 fraction digits
    pub fn new(evaluator: E, quantum: BigDecimal) -> GravtimeResult<Self> {
        validate_quantum(&quantum)?;
        Ok(QuantumDiscretizer { evaluator, quantum })
    }

    pub fn quantum(&self) -> &BigDecimal {
        &self.quantum
    }

    fn units_expr(&self, continuous: &BigDecimal) -> Expr {
        (Expr::from(continuous) / Expr::from(&self.quantum)).floor()
    }

    /// Whole quanta contained in `continuous`
    pub fn units(&self, continuous: &BigDecimal) -> EvalResult<BigDecimal> {
        self.evaluator.evaluate(&self.units_expr(continuous), 0)
    }

    /// `floor(t / quantum) * quantum` at 15 fraction digits.
    ///
    /// Returns `continuous` unchanged if evaluation fails.
    pub fn discretize(&self, continuous: &BigDecimal) -> Evaluated {
        let expr = self.units_expr(continuous) * Expr::from(&self.quantum);
        self.evaluator
            .evaluate_or(&expr, QUANTUM_TIME_SCALE, continuous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravtime_core::GravtimeError;
    use gravtime_precision::{PrecisionEvaluator, UnavailableEvaluator};
    use num_traits::Zero;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn quarter() -> QuantumDiscretizer<PrecisionEvaluator> {
        QuantumDiscretizer::new(PrecisionEvaluator::new(), dec("0.25")).unwrap()
    }

    #[test]
    fn test_floors_to_quantum() {
        let q = quarter();
        assert_eq!(q.discretize(&dec("1.3")).value, dec("1.25"));
        assert_eq!(q.discretize(&dec("1.25")).value, dec("1.25"));
        assert_eq!(q.discretize(&dec("0.2499")).value, dec("0"));
        assert_eq!(q.units(&dec("1.3")).unwrap(), BigDecimal::from(5));
    }

    #[test]
    fn test_negative_floors_away_from_zero() {
        assert_eq!(quarter().discretize(&dec("-0.1")).value, dec("-0.25"));
    }

    #[test]
    fn test_digits_past_working_scale_still_floor() {
        let t = dec("-0.500000000000000000000000000000000000000000001");
        let out = quarter().discretize(&t);
        assert!(!out.is_degraded());
        assert_eq!(out.value, dec("-0.75"));
        assert!(out.value <= t);
        assert_eq!(quarter().units(&t).unwrap(), BigDecimal::from(-3));
    }

    #[test]
    fn test_default_quantum_keeps_ten_digit_values() {
        let q = QuantumDiscretizer::new(PrecisionEvaluator::new(), dec("0.000000000001")).unwrap();
        let t = dec("1.9999999999");
        let out = q.discretize(&t);
        assert!(!out.is_degraded());
        assert_eq!(out.value, t);
        assert_eq!(out.value.to_plain_string(), "1.999999999900000");
    }

    #[test]
    fn test_rejects_unusable_quantum() {
        let err = QuantumDiscretizer::new(PrecisionEvaluator::new(), BigDecimal::zero()).unwrap_err();
        assert!(matches!(err, GravtimeError::Input(_)));
        assert!(QuantumDiscretizer::new(PrecisionEvaluator::new(), dec("5.391e-44")).is_err());
    }

    #[test]
    fn test_fallback_returns_input() {
        let q = QuantumDiscretizer::new(UnavailableEvaluator, dec("0.25")).unwrap();
        let t = dec("1.3");
        let out = q.discretize(&t);
        assert_eq!(out.value, t);
        assert!(out.is_degraded());
    }

    fn quantum_strategy() -> impl Strategy<Value = BigDecimal> {
        (1i64..1000, 0i64..=12).prop_map(|(digits, scale)| BigDecimal::new(digits.into(), scale))
    }

    /// Times with an optional tail beyond the 40-digit working scale
    fn time_strategy() -> impl Strategy<Value = BigDecimal> {
        (-10_000_000_000i64..10_000_000_000, 0i64..=20, -9i64..=9, 41i64..=48).prop_map(
            |(digits, scale, tail, tail_scale)| {
                BigDecimal::new(digits.into(), scale) + BigDecimal::new(tail.into(), tail_scale)
            },
        )
    }

    proptest! {
        #[test]
        fn prop_floor_bound(quantum in quantum_strategy(), t in time_strategy()) {
            let q = QuantumDiscretizer::new(PrecisionEvaluator::new(), quantum.clone()).unwrap();
            let out = q.discretize(&t);
            prop_assert!(!out.is_degraded());
            let gap = &t - &out.value;
            prop_assert!(gap >= BigDecimal::zero());
            prop_assert!(gap < quantum);
        }

        #[test]
        fn prop_idempotent(quantum in quantum_strategy(), t in time_strategy()) {
            let q = QuantumDiscretizer::new(PrecisionEvaluator::new(), quantum).unwrap();
            let once = q.discretize(&t).value;
            let twice = q.discretize(&once).value;
            prop_assert_eq!(once, twice);
        }
    }
}
