use std::cell::RefCell;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::Editor;
use tracing::debug;

use crate::env::Environment;
use crate::evaluator::evaluate;
use crate::parser::parse;
use crate::prelude::prelude;
use crate::value::Value;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Line-oriented repl. Every line evaluates in the same program-global
/// frame, so declarations persist between lines.
pub fn repl() {
    println!("lume v{}", VERSION);

    let global = Rc::new(RefCell::new(Environment::new_enclosed(prelude())));
    let mut rl = Editor::<()>::new();

    loop {
        let readline = rl.readline("> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str());

                match parse("<repl>", &line) {
                    Ok(program) => match evaluate(&program, &global) {
                        Ok(Value::Void) => {}
                        Ok(value) => println!("{}", value.show()),
                        Err(err) => println!("{}", err),
                    },
                    Err(err) => println!("{}", err),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("error: {:?}", err);
                break;
            }
        }
    }

    debug!("repl closed");
}
