mod token;

use std::f64::consts::{E, PI};

use log::trace;
use num_complex::Complex64;

pub use self::token::*;

use crate::value::Value;

/// Scale factor for a single-letter engineering suffix on a numeric literal.
fn engineering_scale(c: char) -> Option<f64> {
    Some(match c {
        'f' => 1e-15,
        'p' => 1e-12,
        'n' => 1e-9,
        'u' => 1e-6,
        'm' => 1e-3,
        'k' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        'T' => 1e12,
        _ => return None,
    })
}

/// A lexer reads a mathematical expression and returns the tokens in the
/// expression. Characters outside the grammar are dropped rather than
/// reported: the engine re-runs on every keystroke and a half-typed query
/// must still produce whatever tokens it already contains.
pub struct Lexer<'a> {
    expr: &'a [u8],
    index: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from an expression.
    pub fn new(expr: &str) -> Lexer {
        Lexer {
            expr: expr.as_bytes(),
            index: 0,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.expr.get(self.index + offset).map(|b| *b as char)
    }

    fn consume_whitespace(&mut self) {
        while self.index < self.expr.len() {
            match self.expr[self.index] as char {
                ' ' | '\n' | '\r' | '\t' => {}
                _ => break,
            }

            self.index += 1;
        }
    }

    fn try_consume_single_char_token(&mut self) -> Option<Token> {
        let original_index = self.index;
        let c = self.peek_at(0)?;

        // `//` fuses into one parallel-combination token
        if c == '/' && self.peek_at(1) == Some('/') {
            self.index += 2;
            return Some(Token {
                kind: TokenKind::Parallel,
                index: original_index,
            });
        }

        if let Some(kind) = TokenKind::from_single_char(c) {
            self.index += 1;

            return Some(Token {
                kind,
                index: original_index,
            });
        }

        None
    }

    /// Consumes `0x`/`0b` radix literals as integers.
    fn try_consume_radix_num(&mut self) -> Option<Token> {
        let original_index = self.index;

        if self.peek_at(0) != Some('0') {
            return None;
        }
        let base = match self.peek_at(1) {
            Some('x') => 16,
            Some('b') => 2,
            _ => return None,
        };

        let mut val: i64 = 0;
        let mut big: Option<f64> = None;
        let mut has_digit = false;
        let mut end = self.index + 2;

        while let Some(digit) = self
            .expr
            .get(end)
            .and_then(|b| (*b as char).to_digit(base))
        {
            big = match big {
                None => match val
                    .checked_mul(base as i64)
                    .and_then(|v| v.checked_add(digit as i64))
                {
                    Some(v) => {
                        val = v;
                        None
                    }
                    // past the integer leg of the lattice
                    None => Some(val as f64 * base as f64 + digit as f64),
                },
                Some(f) => Some(f * base as f64 + digit as f64),
            };
            has_digit = true;
            end += 1;
        }

        // a bare "0x" is not a radix literal; leave the 0 for the decimal
        // path and the letter for the identifier path
        if !has_digit {
            return None;
        }

        self.index = end;
        let kind = match big {
            Some(f) => TokenKind::Num(Value::Float(f)),
            None => TokenKind::Num(Value::Int(val)),
        };
        Some(Token {
            kind,
            index: original_index,
        })
    }

    /// Consumes a decimal literal: digits with an optional fractional part
    /// and exponent, then an optional `j` (imaginary) or engineering suffix.
    fn try_consume_num(&mut self) -> Option<Token> {
        if let Some(token) = self.try_consume_radix_num() {
            return Some(token);
        }

        let original_index = self.index;
        let mut end = self.index;
        let mut has_digit = false;
        let mut has_dot = false;
        let mut has_exp = false;

        while let Some(c) = self.expr.get(end).map(|b| *b as char) {
            if c.is_ascii_digit() {
                has_digit = true;
                end += 1;
            } else if c == '.' && !has_dot {
                has_dot = true;
                end += 1;
            } else {
                break;
            }
        }

        if !has_digit {
            return None;
        }

        // the exponent is only taken when digits follow, so that `2e`
        // still lexes as the number 2 and the constant e
        if let Some('e') | Some('E') = self.expr.get(end).map(|b| *b as char) {
            let mut exp_end = end + 1;
            if let Some('+') | Some('-') = self.expr.get(exp_end).map(|b| *b as char) {
                exp_end += 1;
            }
            if self
                .expr
                .get(exp_end)
                .map_or(false, |b| (*b as char).is_ascii_digit())
            {
                has_exp = true;
                exp_end += 1;
                while self
                    .expr
                    .get(exp_end)
                    .map_or(false, |b| (*b as char).is_ascii_digit())
                {
                    exp_end += 1;
                }
                end = exp_end;
            }
        }

        // the slice is pure ASCII digits/./e/sign, always valid UTF-8
        let literal = std::str::from_utf8(&self.expr[self.index..end]).unwrap();
        self.index = end;

        let suffix = self.peek_at(0);
        if suffix == Some('j') {
            self.index += 1;
            let im: f64 = literal.parse().unwrap();
            return Some(Token {
                kind: TokenKind::Num(Value::Complex(Complex64::new(0.0, im))),
                index: original_index,
            });
        }
        if let Some(scale) = suffix.and_then(engineering_scale) {
            self.index += 1;
            let val: f64 = literal.parse().unwrap();
            return Some(Token {
                kind: TokenKind::Num(Value::Float(val * scale)),
                index: original_index,
            });
        }

        let kind = if has_dot || has_exp {
            TokenKind::Num(Value::Float(literal.parse().unwrap()))
        } else {
            match literal.parse::<i64>() {
                Ok(n) => TokenKind::Num(Value::Int(n)),
                // too large for the integer leg of the lattice
                Err(_) => TokenKind::Num(Value::Float(literal.parse().unwrap())),
            }
        };
        Some(Token {
            kind,
            index: original_index,
        })
    }

    /// Consumes an identifier: a letter, then letters or digits (so that
    /// `log10` and `atan2` are single tokens). The constants `e` and `pi`
    /// become numeric literals right here.
    fn try_consume_ident(&mut self) -> Option<Token> {
        let original_index = self.index;
        let mut ident = String::new();

        if !self.peek_at(0).map_or(false, |c| c.is_ascii_alphabetic()) {
            return None;
        }

        while let Some(c) = self.peek_at(0) {
            if !c.is_ascii_alphanumeric() {
                break;
            }

            ident.push(c);
            self.index += 1;
        }

        let kind = match &*ident {
            "e" => TokenKind::Num(Value::Float(E)),
            "pi" => TokenKind::Num(Value::Float(PI)),
            _ => TokenKind::Ident(ident),
        };
        Some(Token {
            kind,
            index: original_index,
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            self.consume_whitespace();

            // is there anything left?
            if self.index >= self.expr.len() {
                return None;
            }

            let maybe_token = self
                .try_consume_single_char_token()
                .or_else(|| self.try_consume_num())
                .or_else(|| self.try_consume_ident());

            match maybe_token {
                Some(token) => return Some(token),
                None => {
                    // outside the grammar: drop the character and move on
                    trace!(
                        "dropping unrecognized character {:?} at {}",
                        self.expr[self.index] as char,
                        self.index
                    );
                    self.index += 1;
                }
            }
        }
    }
}

/// Runs the lexer over `expr` and inserts the implicit multiplication the
/// grammar allows between a numeric literal and a directly following
/// number, constant or identifier (`2pi`, `3k sin`).
pub fn tokenize(expr: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    for token in Lexer::new(expr) {
        if matches!(token.kind, TokenKind::Num(_) | TokenKind::Ident(_))
            && matches!(tokens.last(), Some(t) if matches!(t.kind, TokenKind::Num(_)))
        {
            tokens.push(Token {
                kind: TokenKind::Times,
                index: token.index,
            });
        }
        tokens.push(token);
    }
    tokens
}
