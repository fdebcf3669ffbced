use std::collections::HashMap;
use std::str::FromStr;

use num_complex::Complex64;
use thiserror::Error;

use super::{FuncKind, Node, OpKind};
use crate::value::{Promoted, Value};

/// A description of the error of a calculation.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum EvalError {
    /// A bare identifier that is neither a constant, a function name nor
    /// bound in the environment.
    #[error("`{0}` is not defined")]
    UnboundIdentifier(String),

    /// A function name used without a call.
    #[error("`{0}` is a function, call it with parentheses")]
    FunctionAsValue(String),

    /// An operation applied outside its domain (factorial of a negative,
    /// bit-and of non-integers, ...).
    #[error("{0}")]
    Domain(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// Approximates the node value, resolving bare identifiers in `env`.
pub fn eval(node: &Node, env: &HashMap<String, Value>) -> Result<Value, EvalError> {
    Ok(match node {
        Node::Num(val) => *val,

        Node::Ident(name) => match env.get(name) {
            Some(val) => *val,
            None if FuncKind::from_str(name).is_ok() => {
                return Err(EvalError::FunctionAsValue(name.clone()));
            }
            None => return Err(EvalError::UnboundIdentifier(name.clone())),
        },

        Node::Neg(inner) => neg(eval(inner, env)?),
        Node::Factorial(inner) => factorial(eval(inner, env)?)?,
        Node::PercentOf(inner) => div(eval(inner, env)?, Value::Int(100))?,

        Node::ApplyPercent { base, percent } => {
            let base = eval(base, env)?;
            let percent = eval(percent, env)?;
            mul(base, add(Value::Int(1), percent))
        }

        Node::NAry { op, operands } => {
            let vals = operands
                .iter()
                .map(|n| eval(n, env))
                .collect::<Result<Vec<_>, _>>()?;
            match op {
                // a power chain evaluates as base ** (product of exponents),
                // matching how it renders
                OpKind::Pow => {
                    let exponent = vals[1..].iter().copied().reduce(mul).unwrap();
                    pow(vals[0], exponent)?
                }
                OpKind::Parallel => parallel(&vals)?,
                _ => {
                    let mut acc = vals[0];
                    for v in &vals[1..] {
                        acc = match op {
                            OpKind::Add => add(acc, *v),
                            OpKind::Sub => sub(acc, *v),
                            OpKind::Mul => mul(acc, *v),
                            OpKind::Div => div(acc, *v)?,
                            OpKind::Mod => modulo(acc, *v)?,
                            OpKind::BitAnd => bit_and(acc, *v)?,
                            OpKind::Pow | OpKind::Parallel => unreachable!(),
                        };
                    }
                    acc
                }
            }
        }

        Node::Call(kind, args) => {
            let vals = args
                .iter()
                .map(|n| eval(n, env))
                .collect::<Result<Vec<_>, _>>()?;
            call(*kind, &vals)?
        }
    })
}

fn neg(v: Value) -> Value {
    match v {
        Value::Int(n) => match n.checked_neg() {
            Some(m) => Value::Int(m),
            None => Value::Float(-(n as f64)),
        },
        Value::Float(x) => Value::Float(-x),
        Value::Complex(c) => Value::Complex(-c),
    }
}

fn add(a: Value, b: Value) -> Value {
    match Value::promote_pair(a, b) {
        Promoted::Int(a, b) => match a.checked_add(b) {
            Some(v) => Value::Int(v),
            None => Value::Float(a as f64 + b as f64),
        },
        Promoted::Float(a, b) => Value::Float(a + b),
        Promoted::Complex(a, b) => Value::Complex(a + b),
    }
}

fn sub(a: Value, b: Value) -> Value {
    match Value::promote_pair(a, b) {
        Promoted::Int(a, b) => match a.checked_sub(b) {
            Some(v) => Value::Int(v),
            None => Value::Float(a as f64 - b as f64),
        },
        Promoted::Float(a, b) => Value::Float(a - b),
        Promoted::Complex(a, b) => Value::Complex(a - b),
    }
}

fn mul(a: Value, b: Value) -> Value {
    match Value::promote_pair(a, b) {
        Promoted::Int(a, b) => match a.checked_mul(b) {
            Some(v) => Value::Int(v),
            None => Value::Float(a as f64 * b as f64),
        },
        Promoted::Float(a, b) => Value::Float(a * b),
        Promoted::Complex(a, b) => Value::Complex(a * b),
    }
}

/// Division always promotes to at least a float: `2/100` is 0.02.
fn div(a: Value, b: Value) -> Result<Value, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    Ok(match Value::promote_pair(a, b) {
        Promoted::Int(a, b) => Value::Float(a as f64 / b as f64),
        Promoted::Float(a, b) => Value::Float(a / b),
        Promoted::Complex(a, b) => Value::Complex(a / b),
    })
}

fn modulo(a: Value, b: Value) -> Result<Value, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    match Value::promote_pair(a, b) {
        // i64::MIN % -1 overflows the checked form but is exactly 0
        Promoted::Int(a, b) => Ok(Value::Int(a.checked_rem(b).unwrap_or(0))),
        Promoted::Float(a, b) => Ok(Value::Float(a % b)),
        Promoted::Complex(..) => Err(EvalError::Domain(
            "modulo needs real operands".to_string(),
        )),
    }
}

fn bit_and(a: Value, b: Value) -> Result<Value, EvalError> {
    match (to_exact_int(a), to_exact_int(b)) {
        (Some(a), Some(b)) => Ok(Value::Int(a & b)),
        _ => Err(EvalError::Domain(
            "bitwise and needs integer operands".to_string(),
        )),
    }
}

fn pow(a: Value, b: Value) -> Result<Value, EvalError> {
    Ok(match Value::promote_pair(a, b) {
        Promoted::Int(a, b) => {
            if b >= 0 {
                match u32::try_from(b).ok().and_then(|e| a.checked_pow(e)) {
                    Some(v) => Value::Int(v),
                    None => Value::Float((a as f64).powf(b as f64)),
                }
            } else if a == 0 {
                return Err(EvalError::DivisionByZero);
            } else {
                Value::Float((a as f64).powf(b as f64))
            }
        }
        Promoted::Float(a, b) => {
            // a negative base with a fractional exponent leaves the reals
            if a < 0.0 && b.fract() != 0.0 {
                Value::Complex(Complex64::new(a, 0.0).powc(Complex64::new(b, 0.0)))
            } else {
                Value::Float(a.powf(b))
            }
        }
        Promoted::Complex(a, b) => Value::Complex(a.powc(b)),
    })
}

/// The generalized parallel-resistance formula over the operand list:
/// the product divided by the sum of the leave-one-out products.
fn parallel(vals: &[Value]) -> Result<Value, EvalError> {
    let product = vals.iter().copied().reduce(mul).unwrap();
    let sum = (0..vals.len())
        .map(|i| {
            vals.iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, v)| *v)
                .reduce(mul)
                .unwrap()
        })
        .reduce(add)
        .unwrap();
    div(product, sum)
}

/// The value as an i64 when it is exactly one.
fn to_exact_int(v: Value) -> Option<i64> {
    match v {
        Value::Int(n) => Some(n),
        Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 => {
            Some(x as i64)
        }
        _ => None,
    }
}

fn factorial(v: Value) -> Result<Value, EvalError> {
    let n = to_exact_int(v)
        .filter(|n| *n >= 0)
        .ok_or_else(|| EvalError::Domain("factorial needs a non-negative integer".to_string()))?;

    let mut acc: i64 = 1;
    for k in 2..=n {
        match acc.checked_mul(k) {
            Some(v) => acc = v,
            None => {
                // past 20! the result leaves the integer leg of the lattice
                let mut facc = acc as f64;
                for j in k..=n {
                    facc *= j as f64;
                }
                return Ok(Value::Float(facc));
            }
        }
    }
    Ok(Value::Int(acc))
}

/// Applies a real function, or its complex counterpart when the argument is
/// complex already.
fn map_real<F, G>(v: Value, real: F, complex: G) -> Value
where
    F: Fn(f64) -> f64,
    G: Fn(Complex64) -> Complex64,
{
    match v {
        Value::Complex(c) => Value::Complex(complex(c)),
        _ => Value::Float(real(v.as_f64().unwrap())),
    }
}

/// Like `map_real`, but promotes a real argument to complex when it falls
/// outside the real domain of the function (`sqrt(-4)`, `asin(2)`, ...).
fn map_or_promote<D, F, G>(v: Value, in_domain: D, real: F, complex: G) -> Value
where
    D: Fn(f64) -> bool,
    F: Fn(f64) -> f64,
    G: Fn(Complex64) -> Complex64,
{
    match v {
        Value::Complex(c) => Value::Complex(complex(c)),
        _ => {
            let x = v.as_f64().unwrap();
            if in_domain(x) {
                Value::Float(real(x))
            } else {
                Value::Complex(complex(Complex64::new(x, 0.0)))
            }
        }
    }
}

fn expect_args(kind: FuncKind, args: &[Value], count: usize) -> Result<(), EvalError> {
    if args.len() != count {
        return Err(EvalError::Domain(format!(
            "{} expects {} argument(s), got {}",
            kind.name(),
            count,
            args.len()
        )));
    }
    Ok(())
}

/// Natural log with the promotion rules shared by every log form: negative
/// reals go complex, zero is out of domain entirely.
fn ln(v: Value) -> Result<Value, EvalError> {
    if v.is_zero() {
        return Err(EvalError::Domain("log of zero".to_string()));
    }
    Ok(map_or_promote(v, |x| x > 0.0, f64::ln, |c| c.ln()))
}

fn call(kind: FuncKind, args: &[Value]) -> Result<Value, EvalError> {
    // log takes an optional base argument, everything else is fixed-arity
    match kind {
        FuncKind::Atan2 | FuncKind::ApplyPct => expect_args(kind, args, 2)?,
        FuncKind::Log => {
            if args.len() != 1 && args.len() != 2 {
                return Err(EvalError::Domain(format!(
                    "log expects 1 or 2 arguments, got {}",
                    args.len()
                )));
            }
        }
        _ => expect_args(kind, args, 1)?,
    }

    let v = args[0];
    Ok(match kind {
        FuncKind::Sin => map_real(v, f64::sin, |c| c.sin()),
        FuncKind::Cos => map_real(v, f64::cos, |c| c.cos()),
        FuncKind::Tan => map_real(v, f64::tan, |c| c.tan()),
        FuncKind::Cotg => map_real(v, |x| x.cos() / x.sin(), |c| c.cos() / c.sin()),
        FuncKind::Asin => map_or_promote(v, |x| (-1.0..=1.0).contains(&x), f64::asin, |c| c.asin()),
        FuncKind::Acos => map_or_promote(v, |x| (-1.0..=1.0).contains(&x), f64::acos, |c| c.acos()),
        FuncKind::Atan => map_real(v, f64::atan, |c| c.atan()),
        FuncKind::Atan2 => match (v.as_f64(), args[1].as_f64()) {
            (Some(y), Some(x)) => Value::Float(y.atan2(x)),
            _ => {
                return Err(EvalError::Domain(
                    "atan2 needs real arguments".to_string(),
                ))
            }
        },
        FuncKind::Sinh => map_real(v, f64::sinh, |c| c.sinh()),
        FuncKind::Cosh => map_real(v, f64::cosh, |c| c.cosh()),
        FuncKind::Tanh => map_real(v, f64::tanh, |c| c.tanh()),
        FuncKind::Asinh => map_real(v, f64::asinh, |c| c.asinh()),
        FuncKind::Acosh => map_or_promote(v, |x| x >= 1.0, f64::acosh, |c| c.acosh()),
        FuncKind::Atanh => {
            map_or_promote(v, |x| (-1.0..=1.0).contains(&x), f64::atanh, |c| c.atanh())
        }
        FuncKind::Ln => ln(v)?,
        FuncKind::Log => {
            let value = ln(v)?;
            match args.get(1) {
                Some(base) => div(value, ln(*base)?)?,
                None => value,
            }
        }
        FuncKind::Log10 => {
            if v.is_zero() {
                return Err(EvalError::Domain("log of zero".to_string()));
            }
            map_or_promote(v, |x| x > 0.0, f64::log10, |c| c.log10())
        }
        // `sqr` resolves to the square root; see FuncKind::from_str
        FuncKind::Sqrt | FuncKind::Sqr => {
            map_or_promote(v, |x| x >= 0.0, f64::sqrt, |c| c.sqrt())
        }
        FuncKind::Factorial => factorial(v)?,
        FuncKind::Abs => match v {
            Value::Int(n) => match n.checked_abs() {
                Some(m) => Value::Int(m),
                None => Value::Float((n as f64).abs()),
            },
            Value::Float(x) => Value::Float(x.abs()),
            Value::Complex(c) => Value::Float(c.norm()),
        },
        FuncKind::Round => round_with(v, f64::round)?,
        FuncKind::Floor => round_with(v, f64::floor)?,
        FuncKind::Ceil => round_with(v, f64::ceil)?,
        FuncKind::Pct => div(v, Value::Int(100))?,
        FuncKind::ApplyPct => mul(v, add(Value::Int(1), args[1])),
    })
}

/// Rounds to an integer value, staying an Int when the result fits.
fn round_with(v: Value, f: fn(f64) -> f64) -> Result<Value, EvalError> {
    match v {
        Value::Int(_) => Ok(v),
        Value::Float(x) => {
            let rounded = f(x);
            match to_exact_int(Value::Float(rounded)) {
                Some(n) => Ok(Value::Int(n)),
                None => Ok(Value::Float(rounded)),
            }
        }
        Value::Complex(_) => Err(EvalError::Domain(
            "rounding needs a real argument".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::lexer::tokenize;
    use crate::parser::Parser;

    fn eval_str(expr: &str) -> Result<Value, EvalError> {
        let tokens = tokenize(expr);
        Parser::new(&tokens).parse().unwrap().eval(&HashMap::new())
    }

    #[test]
    fn it_evaluates_basic_arithmetic() {
        assert_eq!(eval_str("2 + 3 * 4"), Ok(Value::Int(14)));
        assert_eq!(eval_str("2 ^ 3"), Ok(Value::Int(8)));
        assert_eq!(eval_str("5!"), Ok(Value::Int(120)));
        assert_eq!(eval_str("10 - 2 - 3"), Ok(Value::Int(5)));
        assert_eq!(eval_str("7 % 4"), Ok(Value::Int(3)));
        assert_eq!(eval_str("6 & 3"), Ok(Value::Int(2)));
    }

    #[test]
    fn it_promotes_division_to_float() {
        assert_eq!(eval_str("8 / 2"), Ok(Value::Float(4.0)));
        assert_eq!(eval_str("45 // 45"), Ok(Value::Float(22.5)));
        // left-to-right chain: (8/2)/2
        assert_eq!(eval_str("8 / 2 / 2"), Ok(Value::Float(2.0)));
    }

    fn assert_close(result: Result<Value, EvalError>, expected: f64) {
        match result {
            Ok(Value::Float(x)) => assert!((x - expected).abs() < 1e-9, "{} != {}", x, expected),
            other => panic!("expected a float close to {}, got {:?}", expected, other),
        }
    }

    #[test]
    fn it_evaluates_percent_forms() {
        assert_eq!(eval_str("2%"), Ok(Value::Float(0.02)));
        assert_eq!(eval_str("pct(2)"), Ok(Value::Float(0.02)));
        assert_close(eval_str("11+2%"), 11.22);
        assert_close(eval_str("11-2%"), 10.78);
        assert_close(eval_str("apply_pct(11, 0.02)"), 11.22);
    }

    #[test]
    fn it_collapses_power_chains_multiplicatively() {
        // 2^(3*2), not 2^(3^2)
        assert_eq!(eval_str("2 ^ 3 ^ 2"), Ok(Value::Int(64)));
    }

    #[test]
    fn it_resolves_identifiers_in_the_environment() {
        let mut env = HashMap::new();
        env.insert("x".to_string(), Value::Float(21.0));
        let tokens = tokenize("2x");
        let root = Parser::new(&tokens).parse().unwrap();
        assert_eq!(root.eval(&env), Ok(Value::Float(42.0)));

        assert_eq!(
            eval_str("y + 1"),
            Err(EvalError::UnboundIdentifier("y".to_string()))
        );
        assert_eq!(
            eval_str("sin + 1"),
            Err(EvalError::FunctionAsValue("sin".to_string()))
        );
    }

    #[test]
    fn it_reports_domain_errors() {
        assert_eq!(eval_str("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval_str("5 % 0"), Err(EvalError::DivisionByZero));
        assert!(matches!(eval_str("(-5)!"), Err(EvalError::Domain(_))));
        assert!(matches!(eval_str("2.5!"), Err(EvalError::Domain(_))));
        assert!(matches!(eval_str("1.5 & 2"), Err(EvalError::Domain(_))));
        assert!(matches!(eval_str("ln(0)"), Err(EvalError::Domain(_))));
    }

    #[test]
    fn it_promotes_out_of_domain_functions_to_complex() {
        match eval_str("sqrt(-4)") {
            Ok(Value::Complex(c)) => {
                assert!((c.re).abs() < 1e-12);
                assert!((c.im - 2.0).abs() < 1e-12);
            }
            other => panic!("expected a complex result, got {:?}", other),
        }
        assert!(matches!(eval_str("asin(2)"), Ok(Value::Complex(_))));
        assert!(matches!(eval_str("ln(-1)"), Ok(Value::Complex(_))));
        assert!(matches!(eval_str("(-8) ^ 0.5"), Ok(Value::Complex(_))));
    }

    #[test]
    fn it_keeps_the_sqr_alias_on_square_root() {
        assert_eq!(eval_str("sqr(9)"), eval_str("sqrt(9)"));
        assert_eq!(eval_str("sqr(9)"), Ok(Value::Float(3.0)));
    }

    #[test]
    fn it_evaluates_the_function_table() {
        assert_eq!(eval_str("sin(0)"), Ok(Value::Float(0.0)));
        assert_eq!(eval_str("cos(0)"), Ok(Value::Float(1.0)));
        assert_eq!(eval_str("abs(-3)"), Ok(Value::Int(3)));
        assert_eq!(eval_str("floor(2.7)"), Ok(Value::Int(2)));
        assert_eq!(eval_str("ceil(2.2)"), Ok(Value::Int(3)));
        assert_eq!(eval_str("round(2.5)"), Ok(Value::Int(3)));
        assert_eq!(eval_str("factorial(5)"), Ok(Value::Int(120)));
        assert_eq!(eval_str("atan2(0, 1)"), Ok(Value::Float(0.0)));

        match eval_str("cotg(1)") {
            Ok(Value::Float(x)) => {
                assert!((x - 1.0f64.cos() / 1.0f64.sin()).abs() < 1e-12)
            }
            other => panic!("expected a float, got {:?}", other),
        }
        match eval_str("log(10, 2)") {
            Ok(Value::Float(x)) => assert!((x - 10.0f64.ln() / 2.0f64.ln()).abs() < 1e-12),
            other => panic!("expected a float, got {:?}", other),
        }
        assert_eq!(eval_str("log(e)"), eval_str("ln(e)"));
    }

    #[test]
    fn it_does_complex_arithmetic() {
        match eval_str("3j * 3j") {
            Ok(Value::Complex(c)) => {
                assert!((c.re + 9.0).abs() < 1e-12);
                assert!(c.im.abs() < 1e-12);
            }
            other => panic!("expected a complex result, got {:?}", other),
        }
        match eval_str("abs(3 + 4j)") {
            Ok(Value::Float(x)) => assert!((x - 5.0).abs() < 1e-12),
            other => panic!("expected a float, got {:?}", other),
        }
    }

    #[test]
    fn it_falls_back_to_float_on_integer_overflow() {
        match eval_str("25!") {
            Ok(Value::Float(x)) => assert!(x > 1e25),
            other => panic!("expected a float, got {:?}", other),
        }
        match eval_str("2 ^ 80") {
            Ok(Value::Float(x)) => assert!((x - 2f64.powi(80)).abs() < 1e9),
            other => panic!("expected a float, got {:?}", other),
        }
    }
}
