use std::collections::HashMap;
use std::env;

use promptcalc_core::{evaluate, format};

fn main() {
    env_logger::init();

    let expr = env::args().skip(1).collect::<Vec<_>>().join(" ");
    println!("Expression: {}", expr);

    match evaluate(&expr, &HashMap::new()) {
        Ok((val, canonical)) => {
            println!("Canonical form: {}", canonical);

            let form = format(&val);
            println!("Result: {}", form.primary);
            for alt in &form.alternates {
                println!("      = {}", alt);
            }
        }
        Err(err) => println!("Error: {}", err),
    }
}
