//! The expression engine behind the promptcalc launcher plugin.
//!
//! A query string goes through a fixed, synchronous pipeline: the lexer
//! turns it into tokens (dropping anything it does not recognize, since the
//! engine re-runs on every keystroke), the parser builds an n-ary algebraic
//! tree, the evaluator walks the tree over the {integer, float, complex}
//! promotion lattice, and the result formatter renders display strings.
//! The host only sees [`evaluate`], [`format`] and [`to_eng`].

pub mod lexer;
pub mod node;
pub mod parser;
pub mod result;
pub mod value;

use std::collections::HashMap;

use thiserror::Error;

use crate::lexer::tokenize;
use crate::parser::Parser;

pub use crate::node::{EvalError, Node};
pub use crate::parser::ParseError;
pub use crate::result::{format, to_eng, DisplayForm};
pub use crate::value::Value;

/// Anything that can go wrong between a query string and its value. The
/// lexer never contributes: unknown characters are dropped there so typing
/// stays smooth, and only parse- and eval-level failures surface.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Evaluates a query against a read-only environment (the host binds the
/// previously stored result to a name here). On success returns the value
/// together with the canonical form of the parsed tree, which the host
/// shows as the query subtitle.
pub fn evaluate(expr: &str, env: &HashMap<String, Value>) -> Result<(Value, String), Error> {
    let tokens = tokenize(expr);
    let root = Parser::new(&tokens).parse()?;
    let canonical = root.to_string();
    let val = root.eval(env)?;
    Ok((val, canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_ok(expr: &str) -> (Value, String) {
        evaluate(expr, &HashMap::new()).unwrap()
    }

    #[test]
    fn it_evaluates_and_renders_the_documented_cases() {
        let (val, canonical) = eval_ok("2 + 3 * 4");
        assert_eq!(canonical, "(2 + (3 * 4))");
        assert_eq!(val, Value::Int(14));

        let (val, canonical) = eval_ok("2 ^ 3");
        assert_eq!(canonical, "(2**3)");
        assert_eq!(val, Value::Int(8));

        let (val, canonical) = eval_ok("5!");
        assert_eq!(canonical, "factorial(5)");
        assert_eq!(val, Value::Int(120));

        let (val, canonical) = eval_ok("45 // 45");
        assert_eq!(canonical, "(45*45/(45+45))");
        assert_eq!(val, Value::Float(22.5));

        let (val, canonical) = eval_ok("11+2%");
        assert_eq!(canonical, "(11 * (1 + (2/100)))");
        match val {
            Value::Float(x) => assert!((x - 11.22).abs() < 1e-9),
            other => panic!("expected a float, got {:?}", other),
        }
    }

    #[test]
    fn it_resolves_engineering_literals() {
        assert_eq!(eval_ok("1k").0, Value::Float(1000.0));
        assert_eq!(eval_ok("2.5M").0, Value::Float(2_500_000.0));
        assert!(format(&Value::Float(1000.0))
            .alternates
            .contains(&"1k".to_string()));
    }

    #[test]
    fn it_exposes_the_environment_to_queries() {
        let mut env = HashMap::new();
        env.insert("ans".to_string(), Value::Int(40));
        let (val, _) = evaluate("ans + 2", &env).unwrap();
        assert_eq!(val, Value::Int(42));
    }

    #[test]
    fn it_propagates_typed_failures() {
        assert_eq!(
            evaluate("nosuch(1)", &HashMap::new()),
            Err(Error::Parse(ParseError::UnknownFunction {
                name: "nosuch".to_string()
            }))
        );
        assert_eq!(
            evaluate("1/0", &HashMap::new()),
            Err(Error::Eval(EvalError::DivisionByZero))
        );
    }

    #[test]
    fn it_survives_partial_interactive_input() {
        // unmatched parenthesis, dropped characters
        assert_eq!(eval_ok("(2 + 3").0, Value::Int(5));
        assert_eq!(eval_ok("2 + $3").0, Value::Int(5));
        // trailing operator: a typed failure, not a panic
        assert!(evaluate("2 +", &HashMap::new()).is_err());
    }
}
