//! Gravtime Precision - decimal expression evaluation
//!
//! This crate provides:
//! - An expression tree over decimal operands
//! - A text parser for `bc`-style infix expressions
//! - Operand sanitization
//! - The [`Evaluator`] trait and its in-process implementation
//!
//! Evaluation either yields a value at the requested scale or a typed
//! [`EvaluationError`](gravtime_core::EvaluationError). It never picks a
//! fallback on its own; callers do that through [`Evaluator::evaluate_or`].

pub mod evaluator;
pub mod expr;
pub mod operand;
pub mod parser;

pub use evaluator::*;
pub use expr::*;
pub use operand::*;
pub use parser::parse_expr;
