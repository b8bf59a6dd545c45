use thiserror::Error;

/// A syntax error (§6/§7): carries the 1-based line number and a message,
/// matching `original_source`'s x3 error handler which reports a position
/// and an expectation string.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("syntax error at line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        ParseError {
            line,
            message: message.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
