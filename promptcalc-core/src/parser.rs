use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::lexer::{Token, TokenKind};
use crate::node::{FuncKind, Node, OpKind};

/// A parser converts a list of tokens into an AST (abstract syntax tree).
///
/// It is deliberately permissive: the engine re-runs on every keystroke, so
/// an unmatched `(` is treated as closed by the end of input instead of
/// failing the whole query.
pub struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParseError {
    /// A primary expression was expected and the input ended.
    #[error("the expression ends too early")]
    EarlyEof,

    /// A primary expression was expected and this token cannot start one.
    #[error("unexpected token at index {index}")]
    UnexpectedToken { index: usize },

    /// An identifier directly followed by `(` must name a known function.
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &[Token]) -> Parser {
        Parser { tokens, index: 0 }
    }

    pub fn parse(mut self) -> Result<Node, ParseError> {
        self.parse_expression(0)
    }

    fn peek(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.index).map(|t| &t.kind)
    }

    /// The infix operator the next token starts, if any, together with how
    /// many tokens it spans (`* *` is the power operator in disguise).
    fn peek_op(&self) -> Option<(OpKind, usize)> {
        Some(match self.peek()? {
            TokenKind::Plus => (OpKind::Add, 1),
            TokenKind::Minus => (OpKind::Sub, 1),
            TokenKind::Times => {
                if let Some(Token {
                    kind: TokenKind::Times,
                    ..
                }) = self.tokens.get(self.index + 1)
                {
                    (OpKind::Pow, 2)
                } else {
                    (OpKind::Mul, 1)
                }
            }
            TokenKind::Slash => (OpKind::Div, 1),
            TokenKind::Hat => (OpKind::Pow, 1),
            TokenKind::Ampersand => (OpKind::BitAnd, 1),
            TokenKind::Percent => (OpKind::Mod, 1),
            TokenKind::Parallel => (OpKind::Parallel, 1),
            _ => return None,
        })
    }

    /// A `%` is the postfix percent operator when nothing that could start
    /// an operand follows it; otherwise it is binary modulo.
    fn percent_is_postfix(&self) -> bool {
        match self.tokens.get(self.index + 1) {
            None => true,
            Some(t) => t.kind.is_operator(),
        }
    }

    /// Accumulates operands at one precedence level. Runs of the same
    /// operator stay in one flat list; an operator change at the same level
    /// folds the list so mixed `+`/`-` (or `*`/`/`) chains read
    /// left-to-right.
    fn parse_expression(&mut self, min_precedence: u8) -> Result<Node, ParseError> {
        let mut operands = vec![self.parse_primary()?];
        let mut current_op: Option<OpKind> = None;

        while let Some(kind) = self.peek() {
            // postfix operators bind to the last operand before any
            // precedence decision
            match kind {
                TokenKind::Bang => {
                    self.index += 1;
                    let last = operands.pop().unwrap();
                    operands.push(Node::Factorial(Box::new(last)));
                    continue;
                }
                TokenKind::Percent if self.percent_is_postfix() => {
                    self.index += 1;
                    let last = operands.pop().unwrap();
                    operands.push(Node::PercentOf(Box::new(last)));
                    continue;
                }
                _ => {}
            }

            // `)` and `,` end the expression here
            let Some((op, width)) = self.peek_op() else {
                break;
            };
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }

            match current_op {
                None => current_op = Some(op),
                Some(prev) if prev != op => {
                    // recursion at precedence + 1 already consumed anything
                    // stronger, so a change here is same-level or weaker
                    debug_assert!(precedence <= prev.precedence());
                    operands = vec![Node::nary(prev, operands)];
                    current_op = Some(op);
                }
                _ => {}
            }

            self.index += width;
            operands.push(self.parse_expression(precedence + 1)?);
        }

        Ok(match current_op {
            None => operands.pop().unwrap(),
            Some(op) => Node::nary(op, operands),
        })
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = match self.tokens.get(self.index) {
            Some(t) => t.clone(),
            None => return Err(ParseError::EarlyEof),
        };

        Ok(match token.kind {
            TokenKind::Num(val) => {
                self.index += 1;
                Node::Num(val)
            }

            TokenKind::Minus => {
                self.index += 1;
                Node::Neg(Box::new(self.parse_primary()?))
            }

            TokenKind::OpenParen => {
                self.index += 1;
                let expr = self.parse_expression(0)?;
                if self.peek() == Some(&TokenKind::CloseParen) {
                    self.index += 1;
                } else {
                    // closing parentheses are optional at the end of input
                    debug!("implicitly closing parenthesis opened at {}", token.index);
                }
                expr
            }

            TokenKind::Ident(name) => {
                self.index += 1;
                if self.peek() == Some(&TokenKind::OpenParen) {
                    let kind = FuncKind::from_str(&name)
                        .map_err(|_| ParseError::UnknownFunction { name: name.clone() })?;
                    self.index += 1; // consume `(`

                    let mut args = vec![self.parse_expression(0)?];
                    while self.peek() == Some(&TokenKind::Comma) {
                        self.index += 1;
                        args.push(self.parse_expression(0)?);
                    }
                    if self.peek() == Some(&TokenKind::CloseParen) {
                        self.index += 1;
                    }
                    Node::Call(kind, args)
                } else {
                    // a bare name: deferred to the evaluator
                    Node::Ident(name)
                }
            }

            _ => return Err(ParseError::UnexpectedToken { index: token.index }),
        })
    }
}
