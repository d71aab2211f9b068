use std::fmt::Display;

use crate::position::Position;
use crate::value::format_number;

/// Failure to turn source text into an AST. Carries the diagnostic name of
/// the source, the furthest position the parser reached, and a rendering of
/// what was found and expected there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub name: String,
    pub pos: Position,
    pub message: String,
}

impl ParseError {
    pub fn new(name: impl Into<String>, pos: Position, message: impl Into<String>) -> Self {
        ParseError {
            name: name.into(),
            pos,
            message: message.into(),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" {}:\n{}", self.name, self.pos, self.message)
    }
}

impl std::error::Error for ParseError {}

/// A failure during evaluation: a flat message with an optional source
/// position. Errors are rendered for diagnostics, never inspected
/// structurally, so the kinds below differ only in message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub pos: Option<Position>,
    pub message: String,
}

impl RuntimeError {
    pub fn new(pos: Option<Position>, message: impl Into<String>) -> Self {
        RuntimeError {
            pos,
            message: message.into(),
        }
    }

    /// Attaches a position to a freshly built error.
    pub fn at(mut self, pos: Position) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn unbound(pos: Position, name: &str) -> Self {
        Self::new(Some(pos), format!("unbound variable: {}", name))
    }

    pub fn invalid_application(pos: Position) -> Self {
        Self::new(Some(pos), "invalid application")
    }

    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            None,
            format!("type mismatch: expect '{}', actual '{}'", expected, actual),
        )
    }

    pub fn not_implemented(actual: &str) -> Self {
        Self::new(None, format!("function not implemented for '{}'", actual))
    }

    pub fn wrong_arity(expected: Option<usize>, actual: usize) -> Self {
        match expected {
            Some(expected) => Self::new(
                None,
                format!(
                    "wrong number of arguments: expected {}, actual {}",
                    expected, actual
                ),
            ),
            None => Self::new(None, "wrong number of arguments"),
        }
    }

    pub fn out_of_range(index: f64) -> Self {
        Self::new(None, format!("index out of range: {}", format_number(index)))
    }

    pub fn empty_array() -> Self {
        Self::new(None, "empty array")
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{}:\n{}", pos, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Either kind of failure a whole run can end with. Parse and evaluation
/// failures render identically: optional position, then message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_renders_position_then_message() {
        let err = RuntimeError::unbound(Position::new(2, 4), "x");
        assert_eq!(err.to_string(), "(line 2, column 4):\nunbound variable: x");

        let err = RuntimeError::empty_array();
        assert_eq!(err.to_string(), "empty array");
    }

    #[test]
    fn taxonomy_messages() {
        assert_eq!(
            RuntimeError::type_mismatch("boolean", "number").message,
            "type mismatch: expect 'boolean', actual 'number'"
        );
        assert_eq!(
            RuntimeError::wrong_arity(Some(2), 3).message,
            "wrong number of arguments: expected 2, actual 3"
        );
        assert_eq!(
            RuntimeError::wrong_arity(None, 4).message,
            "wrong number of arguments"
        );
        assert_eq!(
            RuntimeError::not_implemented("void").message,
            "function not implemented for 'void'"
        );
        assert_eq!(RuntimeError::out_of_range(3.0).message, "index out of range: 3");
    }
}
