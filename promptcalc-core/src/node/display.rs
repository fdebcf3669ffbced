use std::fmt;
use std::fmt::Display;

use itertools::Itertools;

use super::{Node, OpKind};

impl Display for Node {
    /// Writes the canonical form of the tree. This string is what the host
    /// shows as the query subtitle, and it re-parses under the same grammar
    /// to a tree with the same value — the round-trip test below keeps the
    /// rendering and evaluation rules in lock-step.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Num(val) => val.fmt(f),
            Node::Ident(name) => f.write_str(name),
            Node::Neg(inner) => write!(f, "-{}", inner),
            Node::Factorial(inner) => write!(f, "factorial({})", inner),
            Node::PercentOf(inner) => write!(f, "({}/100)", inner),

            Node::ApplyPercent { base, percent } => match &**percent {
                Node::Neg(inner) => write!(f, "({} * (1 - {}))", base, inner),
                _ => write!(f, "({} * (1 + {}))", base, percent),
            },

            Node::Call(kind, args) => {
                write!(f, "{}({})", kind.name(), args.iter().join(", "))
            }

            Node::NAry {
                op: OpKind::Pow,
                operands,
            } => {
                if operands.len() == 2 {
                    write!(f, "({}**{})", operands[0], operands[1])
                } else {
                    // a longer chain collapses into one exponent product
                    write!(
                        f,
                        "({} ** ({}))",
                        operands[0],
                        operands[1..].iter().join("*")
                    )
                }
            }

            Node::NAry {
                op: OpKind::Parallel,
                operands,
            } => {
                // generalized parallel-resistance formula: the product over
                // the sum of the leave-one-out products
                let product = operands.iter().join("*");
                let sums = (0..operands.len())
                    .map(|i| {
                        operands
                            .iter()
                            .enumerate()
                            .filter(|(j, _)| *j != i)
                            .map(|(_, n)| n)
                            .join("*")
                    })
                    .join("+");
                write!(f, "({}/({}))", product, sums)
            }

            Node::NAry { op, operands } => {
                let sep = format!(" {} ", op.symbol());
                write!(f, "({})", operands.iter().join(&sep))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::value::Value;

    fn render(expr: &str) -> String {
        let tokens = tokenize(expr);
        Parser::new(&tokens).parse().unwrap().to_string()
    }

    #[test]
    fn it_renders_basic_operations() {
        assert_eq!(render("2 + 3"), "(2 + 3)");
        assert_eq!(render("4 - 1"), "(4 - 1)");
        assert_eq!(render("-4 - 1"), "(-4 - 1)");
        assert_eq!(render("5 * 6"), "(5 * 6)");
        assert_eq!(render("8 / 2"), "(8 / 2)");
        assert_eq!(render("6 & 3"), "(6 & 3)");
    }

    #[test]
    fn it_renders_precedence_as_written() {
        assert_eq!(render("2 + 3 * 4"), "(2 + (3 * 4))");
        assert_eq!(render("(2 + 3) * 4"), "((2 + 3) * 4)");
        assert_eq!(render("-(2 + 3) * 4"), "(-(2 + 3) * 4)");
        assert_eq!(render("234*1+12"), "((234 * 1) + 12)");
    }

    #[test]
    fn it_renders_power_with_doubled_stars() {
        assert_eq!(render("2 ^ 3"), "(2**3)");
        // an exponent chain collapses by multiplication
        assert_eq!(render("2 ^ 3 ^ 2"), "(2 ** (3*2))");
    }

    #[test]
    fn it_renders_factorial_as_a_call() {
        assert_eq!(render("5!"), "factorial(5)");
        assert_eq!(render("sin(2)!"), "factorial(sin(2))");
    }

    #[test]
    fn it_expands_the_parallel_operator() {
        assert_eq!(render("45 // 45"), "(45*45/(45+45))");
        assert_eq!(render("45//34"), "(45*34/(34+45))");
        assert_eq!(render("45//34//12"), "(45*34*12/(34*12+45*12+45*34))");
    }

    #[test]
    fn it_renders_percent_forms() {
        assert_eq!(render("2%"), "(2/100)");
        assert_eq!(render("11+2%"), "(11 * (1 + (2/100)))");
        assert_eq!(render("11-2%"), "(11 * (1 - (2/100)))");
        assert_eq!(render("5 % 3"), "(5 % 3)");
    }

    #[test]
    fn it_renders_constants_as_their_values() {
        assert_eq!(render("pi"), std::f64::consts::PI.to_string());
        assert_eq!(render("1k"), "1000.0");
    }

    #[test]
    fn it_renders_function_calls() {
        assert_eq!(render("sin(30)"), "sin(30)");
        assert_eq!(render("log(10, 2)"), "log(10, 2)");
    }

    #[test]
    fn it_round_trips_through_the_grammar() {
        const CASES: [&str; 10] = [
            "1+2",
            "1*3+5",
            "2^3^2",
            "1/(2/3)",
            "2pi",
            "5!",
            "45//34//12",
            "11+2%",
            "0xFF & 0b101",
            "sqrt(2) * sin(1.5)",
        ];
        let env = HashMap::new();
        for c in &CASES {
            let tokens = tokenize(c);
            let root = Parser::new(&tokens).parse().unwrap();

            // format it and re-parse it to check nothing changed
            let formatted = root.to_string();
            let new_tokens = tokenize(&formatted);
            let new_root = Parser::new(&new_tokens).parse().unwrap();

            let ground_truth = root.eval(&env).unwrap();
            let from_formatted = new_root.eval(&env).unwrap();
            match (ground_truth, from_formatted) {
                (Value::Int(a), Value::Int(b)) => assert_eq!(a, b, "case {}", c),
                (a, b) => {
                    let a = a.as_complex();
                    let b = b.as_complex();
                    assert!((a - b).norm() < 1e-9, "case {}: {} vs {}", c, a, b);
                }
            }
        }
    }
}
