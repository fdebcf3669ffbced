use std::fmt;
use std::fmt::{Display, Formatter};

use num_complex::Complex64;
use num_traits::Zero;

/// A numeric value in the promotion lattice Int < Float < Complex.
///
/// The kind of a literal is decided at lex time; operations promote their
/// result to the highest kind among the operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Complex(Complex64),
}

/// Two values brought to their common kind.
pub enum Promoted {
    Int(i64, i64),
    Float(f64, f64),
    Complex(Complex64, Complex64),
}

impl Value {
    /// The real value as an f64, unless the value is complex.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            Value::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Complex64 {
        match self {
            Value::Int(n) => Complex64::new(*n as f64, 0.0),
            Value::Float(x) => Complex64::new(*x, 0.0),
            Value::Complex(c) => *c,
        }
    }

    /// Whether the value is mathematically an integer.
    pub fn is_integral(&self) -> bool {
        match self {
            Value::Int(_) => true,
            Value::Float(x) => x.is_finite() && x.fract() == 0.0,
            Value::Complex(_) => false,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(n) => *n == 0,
            Value::Float(x) => *x == 0.0,
            Value::Complex(c) => c.is_zero(),
        }
    }

    /// Promotes both values to the higher of the two kinds.
    pub fn promote_pair(a: Value, b: Value) -> Promoted {
        match (a, b) {
            (Value::Int(a), Value::Int(b)) => Promoted::Int(a, b),
            (Value::Complex(_), _) | (_, Value::Complex(_)) => {
                Promoted::Complex(a.as_complex(), b.as_complex())
            }
            _ => {
                // at least one float, none complex
                Promoted::Float(a.as_f64().unwrap(), b.as_f64().unwrap())
            }
        }
    }
}

impl Display for Value {
    /// Writes the value as a literal the lexer accepts back.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            // {:?} keeps a trailing ".0" on integral floats so the literal
            // re-lexes as a float, not an integer
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Complex(c) if c.re == 0.0 => write!(f, "{:?}j", c.im),
            Value::Complex(c) if c.im < 0.0 => write!(f, "({:?}-{:?}j)", c.re, -c.im),
            Value::Complex(c) => write!(f, "({:?}+{:?}j)", c.re, c.im),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_promotes_to_the_highest_kind() {
        match Value::promote_pair(Value::Int(1), Value::Int(2)) {
            Promoted::Int(1, 2) => {}
            _ => panic!("expected ints to stay ints"),
        }
        match Value::promote_pair(Value::Int(1), Value::Float(2.5)) {
            Promoted::Float(a, b) => {
                assert_eq!(a, 1.0);
                assert_eq!(b, 2.5);
            }
            _ => panic!("expected promotion to float"),
        }
        match Value::promote_pair(Value::Float(1.0), Value::Complex(Complex64::new(0.0, 2.0))) {
            Promoted::Complex(a, b) => {
                assert_eq!(a, Complex64::new(1.0, 0.0));
                assert_eq!(b, Complex64::new(0.0, 2.0));
            }
            _ => panic!("expected promotion to complex"),
        }
    }

    #[test]
    fn it_detects_integral_values() {
        assert!(Value::Int(-3).is_integral());
        assert!(Value::Float(1000.0).is_integral());
        assert!(!Value::Float(2.5).is_integral());
        assert!(!Value::Float(f64::NAN).is_integral());
        assert!(!Value::Complex(Complex64::new(1.0, 0.0)).is_integral());
    }

    #[test]
    fn it_displays_relexable_literals() {
        assert_eq!(Value::Int(14).to_string(), "14");
        assert_eq!(Value::Float(1000.0).to_string(), "1000.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Complex(Complex64::new(0.0, 3.0)).to_string(), "3.0j");
        assert_eq!(
            Value::Complex(Complex64::new(1.5, -2.0)).to_string(),
            "(1.5-2.0j)"
        );
    }
}
