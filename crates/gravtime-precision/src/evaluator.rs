//! Decimal evaluators
//!
//! The evaluator contract: given an expression and a scale (fraction digits
//! retained), produce a value at that scale or a typed failure. It is a pure
//! function of its inputs.

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::{BigInt, Sign};
use num_traits::{One, Zero};

use gravtime_core::{round_to, EvalResult, EvaluationError, WORKING_SCALE};

use crate::{parse_operand, BinaryOp, Expr};

/// Result of an evaluation that had a fallback available
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluated {
    /// Computed value, or the caller's fallback
    pub value: BigDecimal,
    /// Why the fallback was used, if it was
    pub degraded: Option<EvaluationError>,
}

impl Evaluated {
    pub fn exact(value: BigDecimal) -> Self {
        Evaluated {
            value,
            degraded: None,
        }
    }

    pub fn fallback(value: BigDecimal, cause: EvaluationError) -> Self {
        Evaluated {
            value,
            degraded: Some(cause),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn into_value(self) -> BigDecimal {
        self.value
    }
}

/// Arbitrary-precision decimal evaluator
pub trait Evaluator {
    /// Evaluate `expr`, rounding the result to `scale` fraction digits
    fn evaluate(&self, expr: &Expr, scale: i64) -> EvalResult<BigDecimal>;

    /// Evaluate, substituting `fallback` on any failure
    fn evaluate_or(&self, expr: &Expr, scale: i64, fallback: &BigDecimal) -> Evaluated {
        match self.evaluate(expr, scale) {
            Ok(value) => Evaluated::exact(value),
            Err(err) => {
                tracing::debug!(%expr, %err, "evaluation failed, using fallback");
                Evaluated::fallback(fallback.clone(), err)
            }
        }
    }

    /// Parse and evaluate infix text
    fn evaluate_str(&self, text: &str, scale: i64) -> EvalResult<BigDecimal> {
        let expr = Expr::parse(text)?;
        self.evaluate(&expr, scale)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, expr: &Expr, scale: i64) -> EvalResult<BigDecimal> {
        (**self).evaluate(expr, scale)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, expr: &Expr, scale: i64) -> EvalResult<BigDecimal> {
        (**self).evaluate(expr, scale)
    }
}

fn pow10(exp: u64, l: &BigDecimal, r: &BigDecimal) -> EvalResult<BigInt> {
    let exp = u32::try_from(exp).map_err(|_| EvaluationError::OutOfRange(format!("{} / {}", l, r)))?;
    Ok(BigInt::from(10u8).pow(exp))
}

/// `l / r` rounded toward negative infinity at `scale` fraction digits
///
/// Exact: the quotient is formed over integers, so no digit past `scale`
/// can shift the result.
fn floor_div(l: &BigDecimal, r: &BigDecimal, scale: i64) -> EvalResult<BigDecimal> {
    let (ln, ls) = l.as_bigint_and_exponent();
    let (rn, rs) = r.as_bigint_and_exponent();

    // l / r * 10^scale == ln * 10^(scale + rs - ls) / rn
    let shift = scale + rs - ls;
    let (num, den) = if shift >= 0 {
        (ln * pow10(shift.unsigned_abs(), l, r)?, rn)
    } else {
        (ln, rn * pow10(shift.unsigned_abs(), l, r)?)
    };

    let mut quotient = &num / &den;
    let remainder = &num % &den;
    if !remainder.is_zero() && (remainder.sign() == Sign::Minus) != (den.sign() == Sign::Minus) {
        quotient -= BigInt::one();
    }
    Ok(BigDecimal::new(quotient, scale))
}

/// In-process evaluator backed by `BigDecimal`
///
/// Addition, subtraction and multiplication are exact. Division rounds
/// toward negative infinity and square root truncates, both at the working
/// scale: [`WORKING_SCALE`] or the requested scale, whichever is larger.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrecisionEvaluator;

impl PrecisionEvaluator {
    pub fn new() -> Self {
        PrecisionEvaluator
    }

    fn eval(&self, expr: &Expr, working: i64) -> EvalResult<BigDecimal> {
        match expr {
            Expr::Number(v) => Ok(v.clone()),
            Expr::Operand(raw) => parse_operand(raw),
            Expr::Neg(inner) => Ok(-self.eval(inner, working)?),
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, working)?;
                let r = self.eval(right, working)?;
                match op {
                    BinaryOp::Add => Ok(l + r),
                    BinaryOp::Sub => Ok(l - r),
                    BinaryOp::Mul => Ok(l * r),
                    BinaryOp::Div => {
                        if r.is_zero() {
                            return Err(EvaluationError::DivisionByZero);
                        }
                        floor_div(&l, &r, working)
                    }
                }
            }
            Expr::Compare { op, left, right } => {
                let l = self.eval(left, working)?;
                let r = self.eval(right, working)?;
                Ok(if op.holds(&l, &r) {
                    BigDecimal::one()
                } else {
                    BigDecimal::zero()
                })
            }
            Expr::Sqrt(inner) => {
                let v = self.eval(inner, working)?;
                if v < BigDecimal::zero() {
                    return Err(EvaluationError::NegativeSqrt(v.to_plain_string()));
                }
                v.sqrt()
                    .map(|root| root.with_scale_round(working, RoundingMode::Down))
                    .ok_or_else(|| EvaluationError::NegativeSqrt(v.to_plain_string()))
            }
            Expr::Floor(inner) => {
                let v = self.eval(inner, working)?;
                Ok(v.with_scale_round(0, RoundingMode::Floor))
            }
        }
    }
}

impl Evaluator for PrecisionEvaluator {
    fn evaluate(&self, expr: &Expr, scale: i64) -> EvalResult<BigDecimal> {
        let working = WORKING_SCALE.max(scale);
        let value = self.eval(expr, working)?;
        Ok(round_to(&value, scale))
    }
}

/// Evaluator whose engine is never available
///
/// Stands in for a missing backend and forces every caller onto its
/// fallback path.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableEvaluator;

impl Evaluator for UnavailableEvaluator {
    fn evaluate(&self, _expr: &Expr, _scale: i64) -> EvalResult<BigDecimal> {
        Err(EvaluationError::EngineUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_scale_is_applied() {
        let eval = PrecisionEvaluator::new();
        assert_eq!(eval.evaluate_str("1 / 3", 5).unwrap(), dec("0.33333"));
        assert_eq!(eval.evaluate_str("2 / 3", 5).unwrap(), dec("0.66667"));
        assert_eq!(eval.evaluate_str("0.1 + 1.0", 10).unwrap().to_plain_string(), "1.1000000000");
    }

    #[test]
    fn test_division_rounds_toward_negative_infinity() {
        let eval = PrecisionEvaluator::new();
        // 45 fraction digits: the tail sits past the working scale
        let t = "-0.500000000000000000000000000000000000000000001";
        assert_eq!(
            eval.evaluate_str(&format!("floor({} / 0.25)", t), 0).unwrap(),
            BigDecimal::from(-3)
        );
        assert_eq!(
            eval.evaluate_str(&format!("floor({} / -0.25)", t.trim_start_matches('-')), 0).unwrap(),
            BigDecimal::from(-3)
        );
        assert_eq!(
            eval.evaluate_str("floor(0.500000000000000000000000000000000000000000001 / 0.25)", 0).unwrap(),
            BigDecimal::from(2)
        );
        assert_eq!(eval.evaluate_str("floor(-1 / 4)", 0).unwrap(), BigDecimal::from(-1));
        assert_eq!(eval.evaluate_str("-6 / 3", 0).unwrap(), BigDecimal::from(-2));
    }

    #[test]
    fn test_floor_div_exact_quotients() {
        assert_eq!(floor_div(&dec("-7"), &dec("2"), 0).unwrap(), dec("-4"));
        assert_eq!(floor_div(&dec("7"), &dec("-2"), 0).unwrap(), dec("-4"));
        assert_eq!(floor_div(&dec("-7"), &dec("-2"), 0).unwrap(), dec("3"));
        assert_eq!(floor_div(&dec("1"), &dec("3"), 3).unwrap(), dec("0.333"));
        assert_eq!(floor_div(&dec("-1"), &dec("3"), 3).unwrap(), dec("-0.334"));
        assert_eq!(floor_div(&dec("1.5"), &dec("0.5"), 2).unwrap(), dec("3.00"));
        assert_eq!(floor_div(&dec("1e5"), &dec("1e-3"), 0).unwrap(), dec("100000000"));
    }

    #[test]
    fn test_sqrt() {
        let eval = PrecisionEvaluator::new();
        assert_eq!(eval.evaluate_str("sqrt(2)", 15).unwrap(), dec("1.414213562373095"));
        assert_eq!(eval.evaluate_str("sqrt(0)", 3).unwrap(), dec("0"));
    }

    #[test]
    fn test_failures_are_typed() {
        let eval = PrecisionEvaluator::new();
        assert_eq!(
            eval.evaluate_str("1 / (2 - 2)", 10),
            Err(EvaluationError::DivisionByZero)
        );
        assert!(matches!(
            eval.evaluate_str("sqrt(1 - 2)", 10),
            Err(EvaluationError::NegativeSqrt(_))
        ));
        assert!(matches!(
            eval.evaluate(&(Expr::operand("  ") + Expr::num(1u64)), 10),
            Err(EvaluationError::MalformedOperand(_))
        ));
    }

    #[test]
    fn test_comparison_yields_one_or_zero() {
        let eval = PrecisionEvaluator::new();
        assert_eq!(eval.evaluate_str("0.0000000001 > 0", 0).unwrap(), BigDecimal::one());
        assert_eq!(eval.evaluate_str("2 != 2", 0).unwrap(), BigDecimal::zero());
    }

    #[test]
    fn test_floor() {
        let eval = PrecisionEvaluator::new();
        assert_eq!(eval.evaluate_str("floor(7 / 2)", 0).unwrap(), BigDecimal::from(3));
        assert_eq!(eval.evaluate_str("floor(-7 / 2)", 0).unwrap(), BigDecimal::from(-4));
    }

    #[test]
    fn test_weak_field_signal_survives() {
        // Rs/R and Rs/(R+h) only differ past the 9th decimal place
        let eval = PrecisionEvaluator::new();
        let surface = eval.evaluate_str("0.0089 / 6371000", 20).unwrap();
        let high = eval.evaluate_str("0.0089 / 6471000", 20).unwrap();
        assert!(surface > high);
        assert_eq!(
            eval.evaluate_str("0.0089 / 6371000 > 0.0089 / 6471000", 0).unwrap(),
            BigDecimal::one()
        );
    }

    #[test]
    fn test_evaluate_or_uses_fallback() {
        let fallback = dec("1.5");
        let out = UnavailableEvaluator.evaluate_or(&Expr::num(2u64), 10, &fallback);
        assert_eq!(out.value, fallback);
        assert_eq!(out.degraded, Some(EvaluationError::EngineUnavailable));

        let out = PrecisionEvaluator::new().evaluate_or(&Expr::num(2u64), 10, &fallback);
        assert!(!out.is_degraded());
        assert_eq!(out.into_value(), BigDecimal::from(2));
    }

    #[test]
    fn test_borrowed_and_boxed_evaluators() {
        let eval = PrecisionEvaluator::new();
        let by_ref: &dyn Evaluator = &eval;
        let boxed: Box<dyn Evaluator> = Box::new(UnavailableEvaluator);
        assert!((&by_ref).evaluate_str("1 + 1", 0).is_ok());
        assert!(boxed.evaluate_str("1 + 1", 0).is_err());
    }
}
