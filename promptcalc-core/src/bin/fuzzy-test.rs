//! Generates random expression trees forever and checks that rendering,
//! re-parsing and re-evaluating agrees with evaluating the tree directly.

use std::collections::HashMap;

use promptcalc_core::lexer::tokenize;
use promptcalc_core::node::{Node, OpKind};
use promptcalc_core::parser::Parser;
use promptcalc_core::value::Value;
use rand::prelude::*;

struct RecursiveCtx {
    pub depth: u32,
    pub inside_pow: bool,
}

fn random_value(ctx: &RecursiveCtx) -> Value {
    let mut rng = thread_rng();
    if ctx.inside_pow {
        // keep exponents small so nothing explodes
        return Value::Int(rng.gen_range(0..4));
    }
    match rng.gen_range(0..4) {
        0 => Value::Int(rng.gen_range(-100..100)),
        1 => Value::Int(rng.gen_range(1..1000)),
        2 => Value::Float(rng.gen_range(-100.0..100.0)),
        _ => Value::Float(rng.gen_range(0.001..10.0)),
    }
}

fn random_operands(ctx: &RecursiveCtx) -> Vec<Node> {
    let count = thread_rng().gen_range(2..4);
    (0..count).map(|_| random_node(ctx)).collect()
}

fn random_node(ctx: &RecursiveCtx) -> Node {
    let mut rng = thread_rng();
    if ctx.depth >= 4 || rng.gen_range(0..3) == 0 {
        return Node::Num(random_value(ctx));
    }

    let deeper = RecursiveCtx {
        depth: ctx.depth + 1,
        inside_pow: ctx.inside_pow,
    };
    match rng.gen_range(0..7) {
        0 => Node::Neg(Box::new(random_node(&deeper))),
        1 => Node::nary(OpKind::Add, random_operands(&deeper)),
        2 => Node::nary(OpKind::Sub, random_operands(&deeper)),
        3 => Node::nary(OpKind::Mul, random_operands(&deeper)),
        4 => Node::nary(OpKind::Div, random_operands(&deeper)),
        5 => Node::nary(OpKind::Parallel, random_operands(&deeper)),
        _ => {
            let exponent = Node::Num(random_value(&RecursiveCtx {
                depth: deeper.depth,
                inside_pow: true,
            }));
            Node::nary(OpKind::Pow, vec![random_node(&deeper), exponent])
        }
    }
}

fn is_finite(val: &Value) -> bool {
    match val {
        Value::Int(_) => true,
        Value::Float(x) => x.is_finite(),
        Value::Complex(c) => c.re.is_finite() && c.im.is_finite(),
    }
}

fn main() {
    env_logger::init();

    let env = HashMap::new();
    let mut checked: u64 = 0;

    loop {
        let root = random_node(&RecursiveCtx {
            depth: 0,
            inside_pow: false,
        });

        let direct = match root.eval(&env) {
            Ok(val) if is_finite(&val) => val,
            // a random zero divisor or an overflow: nothing to compare
            _ => continue,
        };

        let rendered = root.to_string();
        let tokens = tokenize(&rendered);
        let reparsed = Parser::new(&tokens)
            .parse()
            .unwrap_or_else(|err| panic!("`{}` does not re-parse: {}", rendered, err));
        let roundtrip = reparsed
            .eval(&env)
            .unwrap_or_else(|err| panic!("`{}` does not re-evaluate: {}", rendered, err));

        let a = direct.as_complex();
        let b = roundtrip.as_complex();
        let delta = (a - b).norm();
        assert!(
            delta <= 1e-6 * (1.0 + a.norm()),
            "`{}`: {} directly but {} after the round trip",
            rendered,
            direct,
            roundtrip
        );

        checked += 1;
        if checked % 10_000 == 0 {
            println!("{} expressions verified", checked);
        }
    }
}
