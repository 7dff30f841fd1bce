//! Operand sanitization
//!
//! Operands arriving as text (config files, device responses, calculator
//! output) can carry whitespace, line continuations or a locale comma.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use gravtime_core::{EvalResult, EvaluationError};

/// Strip whitespace and line continuations, accept `,` as decimal separator
pub fn sanitize_operand(raw: &str) -> String {
    let mut cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\\')
        .collect();

    if !cleaned.contains('.') && cleaned.matches(',').count() == 1 {
        cleaned = cleaned.replace(',', ".");
    }
    cleaned
}

/// Largest accepted exponent magnitude in `1e<n>` literals
pub const MAX_EXPONENT: u32 = 1000;

/// Pieces of a decimal literal: sign, integer digits, fraction digits, exponent
struct Literal<'a> {
    negative: bool,
    int_part: &'a str,
    frac_part: &'a str,
    exponent: Option<&'a str>,
}

/// Split `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn split_literal(s: &str) -> Option<Literal<'_>> {
    let negative = s.starts_with('-');
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };

    let digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if !digits(int_part) || !digits(frac_part) || (int_part.is_empty() && frac_part.is_empty()) {
        return None;
    }

    if let Some(exp) = exponent {
        let unsigned = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if unsigned.is_empty() || !digits(unsigned) {
            return None;
        }
        match unsigned.parse::<u32>() {
            Ok(e) if e <= MAX_EXPONENT => {}
            _ => return None,
        }
    }

    Some(Literal {
        negative,
        int_part,
        frac_part,
        exponent,
    })
}

/// Sanitize and parse a decimal operand
pub fn parse_operand(raw: &str) -> EvalResult<BigDecimal> {
    let malformed = || EvaluationError::MalformedOperand(raw.to_string());
    let cleaned = sanitize_operand(raw);
    let literal = split_literal(&cleaned).ok_or_else(malformed)?;

    // canonical form: `bc` prints `.5`, humans write `3.`
    let mut canonical = String::with_capacity(cleaned.len() + 1);
    if literal.negative {
        canonical.push('-');
    }
    canonical.push_str(if literal.int_part.is_empty() { "0" } else { literal.int_part });
    if !literal.frac_part.is_empty() {
        canonical.push('.');
        canonical.push_str(literal.frac_part);
    }
    if let Some(exp) = literal.exponent {
        canonical.push('e');
        canonical.push_str(exp);
    }

    BigDecimal::from_str(&canonical).map_err(|_| malformed())
}
