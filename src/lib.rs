pub mod ast;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod prelude;
pub mod repl;
pub mod token;
pub mod value;

pub use crate::error::{Error, ParseError, RuntimeError};
pub use crate::evaluator::{evaluate, run};
pub use crate::parser::parse;
pub use crate::value::Value;

/// Parses and runs a program against a fresh prelude. `name` labels the
/// source in diagnostics.
pub fn interpret(name: &str, source: &str) -> Result<Value, Error> {
    let program = parser::parse(name, source)?;
    let value = evaluator::run(prelude::prelude(), &program)?;
    Ok(value)
}
