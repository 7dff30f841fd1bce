//! Infix expression parser
//!
//! Accepts the `bc` subset the pipeline needs:
//! `+ - * /`, unary minus, parentheses, comparisons, `sqrt(..)` and `floor(..)`.
//! Binary operators are parsed by precedence climbing; all are left-associative.
//! Trees deeper than [`MAX_NESTING`] are rejected so evaluation never runs out of stack.

use gravtime_core::{EvalResult, EvaluationError};

use crate::{BinaryOp, CompareOp, Expr};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Cmp(CompareOp),
}

fn malformed(position: usize, reason: impl Into<String>) -> EvaluationError {
    EvaluationError::MalformedExpression {
        position,
        reason: reason.into(),
    }
}

fn tokenize(text: &str) -> EvalResult<Vec<(usize, Token)>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        match c {
            b' ' | b'\t' | b'\r' | b'\n' | b'\\' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                // exponent only when digits follow, so `2e` stays an error
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                tokens.push((start, Token::Number(text[start..i].to_string())));
                continue;
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((start, Token::Ident(text[start..i].to_string())));
                continue;
            }
            _ => {}
        }

        let next = bytes.get(i + 1).copied();
        let (token, width) = match (c, next) {
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b'<', Some(b'=')) => (Token::Cmp(CompareOp::Le), 2),
            (b'>', Some(b'=')) => (Token::Cmp(CompareOp::Ge), 2),
            (b'=', Some(b'=')) => (Token::Cmp(CompareOp::Eq), 2),
            (b'!', Some(b'=')) => (Token::Cmp(CompareOp::Ne), 2),
            (b'<', _) => (Token::Cmp(CompareOp::Lt), 1),
            (b'>', _) => (Token::Cmp(CompareOp::Gt), 1),
            _ => {
                let ch = text[i..].chars().next().unwrap_or('?');
                return Err(malformed(i, format!("unexpected character {:?}", ch)));
            }
        };
        tokens.push((start, token));
        i += width;
    }

    Ok(tokens)
}

/// Deepest expression tree the parser will build
pub const MAX_NESTING: usize = 256;

enum Infix {
    Arith(BinaryOp),
    Cmp(CompareOp),
}

fn infix_info(token: &Token) -> Option<(u8, Infix)> {
    match token {
        Token::Cmp(op) => Some((30, Infix::Cmp(*op))),
        Token::Plus => Some((40, Infix::Arith(BinaryOp::Add))),
        Token::Minus => Some((40, Infix::Arith(BinaryOp::Sub))),
        Token::Star => Some((50, Infix::Arith(BinaryOp::Mul))),
        Token::Slash => Some((50, Infix::Arith(BinaryOp::Div))),
        _ => None,
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    /// Open prefix / paren / call frames
    depth: usize,
}

/// Parsed subtree with its height
type Parsed = (Expr, usize);

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn expect_rparen(&mut self) -> EvalResult<()> {
        let at = self.offset();
        match self.advance() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(malformed(at, format!("expected ')', found {:?}", other))),
            None => Err(malformed(at, "expected ')', found end of input")),
        }
    }

    fn enter(&mut self) -> EvalResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(malformed(self.offset(), "nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    fn grow(&self, at: usize, height: usize) -> EvalResult<usize> {
        if height >= MAX_NESTING {
            return Err(malformed(at, "nesting too deep"));
        }
        Ok(height + 1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> EvalResult<Parsed> {
        let (mut left, mut height) = self.parse_prefix()?;

        while let Some((prec, infix)) = self.peek().and_then(infix_info) {
            if prec < min_prec {
                break;
            }
            let at = self.offset();
            self.advance();
            let (right, right_height) = self.parse_binary(prec + 1)?;
            height = self.grow(at, height.max(right_height))?;
            left = match infix {
                Infix::Arith(op) => Expr::binary(op, left, right),
                Infix::Cmp(op) => left.compare(op, right),
            };
        }

        Ok((left, height))
    }

    fn parse_prefix(&mut self) -> EvalResult<Parsed> {
        let at = self.offset();
        match self.peek() {
            Some(Token::Minus) => {
                self.enter()?;
                self.advance();
                let (operand, height) = self.parse_prefix()?;
                self.depth -= 1;
                Ok((-operand, self.grow(at, height)?))
            }
            Some(Token::Plus) => {
                self.enter()?;
                self.advance();
                let parsed = self.parse_prefix()?;
                self.depth -= 1;
                Ok(parsed)
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> EvalResult<Parsed> {
        let at = self.offset();
        match self.advance() {
            Some(Token::Number(text)) => Ok((
                Expr::Number(
                    crate::parse_operand(&text)
                        .map_err(|_| malformed(at, format!("bad number {:?}", text)))?,
                ),
                1,
            )),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_binary(0)?;
                self.expect_rparen()?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let open = self.offset();
                if self.advance() != Some(Token::LParen) {
                    return Err(malformed(open, format!("expected '(' after {}", name)));
                }
                self.enter()?;
                let (arg, height) = self.parse_binary(0)?;
                self.expect_rparen()?;
                self.depth -= 1;
                let height = self.grow(at, height)?;
                match name.as_str() {
                    "sqrt" => Ok((arg.sqrt(), height)),
                    "floor" => Ok((arg.floor(), height)),
                    _ => Err(malformed(at, format!("unknown function {}", name))),
                }
            }
            Some(other) => Err(malformed(at, format!("unexpected {:?}", other))),
            None => Err(malformed(at, "unexpected end of input")),
        }
    }
}

/// Parse an infix expression
pub fn parse_expr(text: &str) -> EvalResult<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(malformed(0, "empty expression"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.len(),
        depth: 0,
    };
    let (expr, _) = parser.parse_binary(0)?;

    if parser.pos < parser.tokens.len() {
        let at = parser.offset();
        return Err(malformed(at, "trailing input"));
    }
    Ok(expr)
}
