//! Expression Fuzzer - Seeded random testing for the precision evaluator
//!
//! Tests:
//! - Printed expressions parse back to the same tree
//! - Evaluation is deterministic
//! - Failures are typed, never panics
//! - Fallbacks return exactly the caller's value
//! - Arbitrary text never panics the parser

use bigdecimal::BigDecimal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gravtime_core::EvaluationError;
use gravtime_precision::{parse_expr, BinaryOp, CompareOp, Evaluator, Expr, PrecisionEvaluator};

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct ExprFuzzerConfig {
    /// Expressions to generate
    pub iterations: usize,
    /// Maximum tree depth
    pub max_depth: u32,
    /// Random text inputs to feed the parser
    pub text_inputs: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for ExprFuzzerConfig {
    fn default() -> Self {
        ExprFuzzerConfig {
            iterations: 500,
            max_depth: 5,
            text_inputs: 500,
            seed: 42,
        }
    }
}

impl ExprFuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        ExprFuzzerConfig {
            iterations: 100,
            max_depth: 4,
            text_inputs: 100,
            seed: 7,
        }
    }
}

/// Failure counts by kind, plus property violations
#[derive(Debug, Default)]
pub struct ExprFuzzResult {
    pub evaluated: usize,
    pub division_by_zero: usize,
    pub negative_sqrt: usize,
    pub other_failures: usize,
    pub roundtrip_violations: Vec<String>,
    pub determinism_violations: Vec<String>,
    pub fallback_violations: Vec<String>,
}

impl ExprFuzzResult {
    pub fn is_valid(&self) -> bool {
        self.roundtrip_violations.is_empty()
            && self.determinism_violations.is_empty()
            && self.fallback_violations.is_empty()
    }
}

pub struct ExprFuzzer {
    config: ExprFuzzerConfig,
    rng: StdRng,
    evaluator: PrecisionEvaluator,
}

const TEXT_ALPHABET: &[u8] = b"0123456789.+-*/()<>=! sqrtflore,\\";

impl ExprFuzzer {
    pub fn new(config: ExprFuzzerConfig) -> Self {
        ExprFuzzer {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            evaluator: PrecisionEvaluator::new(),
        }
    }

    fn number(&mut self) -> Expr {
        let digits: u64 = self.rng.gen_range(0..100_000);
        let scale: i64 = self.rng.gen_range(0..8);
        Expr::num(BigDecimal::new(digits.into(), scale))
    }

    /// Random tree of at most `depth` levels; literals are non-negative
    pub fn gen_expr(&mut self, depth: u32) -> Expr {
        if depth == 0 || self.rng.gen_bool(0.25) {
            return self.number();
        }
        match self.rng.gen_range(0..8) {
            0 => -self.gen_expr(depth - 1),
            1 => self.gen_expr(depth - 1).sqrt(),
            2 => self.gen_expr(depth - 1).floor(),
            3 => {
                let op = [
                    CompareOp::Lt,
                    CompareOp::Le,
                    CompareOp::Gt,
                    CompareOp::Ge,
                    CompareOp::Eq,
                    CompareOp::Ne,
                ][self.rng.gen_range(0..6)];
                let left = self.gen_expr(depth - 1);
                left.compare(op, self.gen_expr(depth - 1))
            }
            n => {
                let op = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div][n as usize - 4];
                let left = self.gen_expr(depth - 1);
                Expr::binary(op, left, self.gen_expr(depth - 1))
            }
        }
    }

    fn gen_text(&mut self) -> String {
        let len = self.rng.gen_range(0..24);
        (0..len)
            .map(|_| TEXT_ALPHABET[self.rng.gen_range(0..TEXT_ALPHABET.len())] as char)
            .collect()
    }

    pub fn run(&mut self) -> ExprFuzzResult {
        let mut result = ExprFuzzResult::default();
        let fallback = BigDecimal::new(12345i64.into(), 4);

        for i in 0..self.config.iterations {
            let expr = self.gen_expr(self.config.max_depth);
            let scale = self.rng.gen_range(0..20);

            match parse_expr(&expr.to_string()) {
                Ok(parsed) if parsed == expr => {}
                Ok(parsed) => result
                    .roundtrip_violations
                    .push(format!("#{}: {} reparsed as {}", i, expr, parsed)),
                Err(err) => result
                    .roundtrip_violations
                    .push(format!("#{}: {} failed to reparse: {}", i, expr, err)),
            }

            let first = self.evaluator.evaluate(&expr, scale);
            let second = self.evaluator.evaluate(&expr, scale);
            if first != second {
                result
                    .determinism_violations
                    .push(format!("#{}: {} gave {:?} then {:?}", i, expr, first, second));
            }

            match first {
                Ok(_) => result.evaluated += 1,
                Err(EvaluationError::DivisionByZero) => result.division_by_zero += 1,
                Err(EvaluationError::NegativeSqrt(_)) => result.negative_sqrt += 1,
                Err(_) => result.other_failures += 1,
            }

            let out = self.evaluator.evaluate_or(&expr, scale, &fallback);
            if out.is_degraded() && out.value != fallback {
                result
                    .fallback_violations
                    .push(format!("#{}: degraded value {} is not the fallback", i, out.value));
            }
        }

        for _ in 0..self.config.text_inputs {
            let text = self.gen_text();
            if let Ok(expr) = parse_expr(&text) {
                let _ = self.evaluator.evaluate(&expr, 10);
            }
        }

        result
    }
}
