mod display;
mod eval;

pub use self::eval::{eval, EvalError};

use std::collections::HashMap;
use std::str::FromStr;

use log::debug;

use crate::value::Value;

/// The infix operators. Consecutive occurrences of the same operator at one
/// precedence level flatten into a single n-ary node instead of a nested
/// binary chain; rendering and evaluation both rely on that shape.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    Parallel,
    Pow,
}

impl OpKind {
    /// Binding power. The postfix operators (`!`, percent) bind above all
    /// of these.
    pub fn precedence(self) -> u8 {
        match self {
            OpKind::Add | OpKind::Sub => 1,
            OpKind::Mul | OpKind::Div | OpKind::Mod | OpKind::BitAnd | OpKind::Parallel => 2,
            OpKind::Pow => 3,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Add => "+",
            OpKind::Sub => "-",
            OpKind::Mul => "*",
            OpKind::Div => "/",
            OpKind::Mod => "%",
            OpKind::BitAnd => "&",
            OpKind::Parallel => "//",
            OpKind::Pow => "**",
        }
    }
}

/// The functions an identifier followed by `(` may name.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FuncKind {
    Sin,
    Cos,
    Tan,
    Cotg,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Log,
    Ln,
    Log10,
    Sqrt,
    Sqr,
    Factorial,
    Abs,
    Round,
    Floor,
    Ceil,
    Pct,
    ApplyPct,
}

impl FromStr for FuncKind {
    type Err = ();

    // lookups are case-sensitive
    fn from_str(s: &str) -> Result<FuncKind, ()> {
        Ok(match s {
            "sin" => FuncKind::Sin,
            "cos" => FuncKind::Cos,
            "tan" => FuncKind::Tan,
            "cotg" => FuncKind::Cotg,
            "asin" => FuncKind::Asin,
            "acos" => FuncKind::Acos,
            "atan" => FuncKind::Atan,
            "atan2" => FuncKind::Atan2,
            "sinh" => FuncKind::Sinh,
            "cosh" => FuncKind::Cosh,
            "tanh" => FuncKind::Tanh,
            "asinh" => FuncKind::Asinh,
            "acosh" => FuncKind::Acosh,
            "atanh" => FuncKind::Atanh,
            "log" => FuncKind::Log,
            "ln" => FuncKind::Ln,
            "log10" => FuncKind::Log10,
            "sqrt" => FuncKind::Sqrt,
            // `sqr` has always resolved to the square root in the shipped
            // plugin; the alias is kept so existing queries do not change
            // meaning
            "sqr" => FuncKind::Sqr,
            "factorial" => FuncKind::Factorial,
            "abs" => FuncKind::Abs,
            "round" => FuncKind::Round,
            "floor" => FuncKind::Floor,
            "ceil" => FuncKind::Ceil,
            "pct" => FuncKind::Pct,
            "apply_pct" => FuncKind::ApplyPct,
            _ => return Err(()),
        })
    }
}

impl FuncKind {
    pub fn name(self) -> &'static str {
        match self {
            FuncKind::Sin => "sin",
            FuncKind::Cos => "cos",
            FuncKind::Tan => "tan",
            FuncKind::Cotg => "cotg",
            FuncKind::Asin => "asin",
            FuncKind::Acos => "acos",
            FuncKind::Atan => "atan",
            FuncKind::Atan2 => "atan2",
            FuncKind::Sinh => "sinh",
            FuncKind::Cosh => "cosh",
            FuncKind::Tanh => "tanh",
            FuncKind::Asinh => "asinh",
            FuncKind::Acosh => "acosh",
            FuncKind::Atanh => "atanh",
            FuncKind::Log => "log",
            FuncKind::Ln => "ln",
            FuncKind::Log10 => "log10",
            FuncKind::Sqrt => "sqrt",
            FuncKind::Sqr => "sqr",
            FuncKind::Factorial => "factorial",
            FuncKind::Abs => "abs",
            FuncKind::Round => "round",
            FuncKind::Floor => "floor",
            FuncKind::Ceil => "ceil",
            FuncKind::Pct => "pct",
            FuncKind::ApplyPct => "apply_pct",
        }
    }
}

/// A node is an operation in the AST (abstract syntax tree).
///
/// A node's tag fixes both its evaluation rule and its canonical rendering;
/// the rendered string re-parses to a tree with the same value.
#[derive(Debug, PartialEq, Clone)]
pub enum Node {
    Num(Value),

    /// An identifier the evaluator resolves against the environment.
    Ident(String),

    Neg(Box<Node>),
    Factorial(Box<Node>),

    /// The postfix percent operator: operand / 100.
    PercentOf(Box<Node>),

    /// A percentage adjustment, base * (1 + percent). The percent side is
    /// Neg-wrapped when the adjustment subtracts.
    ApplyPercent { base: Box<Node>, percent: Box<Node> },

    NAry { op: OpKind, operands: Vec<Node> },
    Call(FuncKind, Vec<Node>),
}

impl Node {
    /// Builds an n-ary node. Additive chains get the percentage-adjustment
    /// rewrite (`11 + 2%` means `11 * (1 + 2/100)`, not `11.02`), and a
    /// list left with a single operand collapses to that operand.
    pub fn nary(op: OpKind, mut operands: Vec<Node>) -> Node {
        if matches!(op, OpKind::Add | OpKind::Sub) {
            operands = rewrite_percent_adjustments(op, operands);
        }
        if operands.len() == 1 {
            return operands.pop().unwrap();
        }
        Node::NAry { op, operands }
    }

    /// Approximates the node value, resolving identifiers in `env`.
    pub fn eval(&self, env: &HashMap<String, Value>) -> Result<Value, EvalError> {
        eval(self, env)
    }
}

/// Replaces `a OP x%` pairs in an additive operand list with a single
/// percentage-adjustment node; under subtraction the percent flips sign.
fn rewrite_percent_adjustments(op: OpKind, operands: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(operands.len());
    for node in operands {
        match node {
            Node::PercentOf(_) if !out.is_empty() => {
                debug!("rewriting percent operand as a {:?} adjustment", op);
                let base = out.pop().unwrap();
                let percent = if op == OpKind::Sub {
                    Node::Neg(Box::new(node))
                } else {
                    node
                };
                out.push(Node::ApplyPercent {
                    base: Box::new(base),
                    percent: Box::new(percent),
                });
            }
            other => out.push(other),
        }
    }
    out
}
