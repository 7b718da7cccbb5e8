use std::fmt;
use thiserror::Error;

/// Location in source code for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Every failure the pipeline can report.
///
/// Lexing, parsing and running are all fatal on the first error: there is no
/// recovery and no partial result.
#[derive(Error, Debug)]
pub enum Error {
    #[error("lex error at {location}: {message}")]
    Lexer {
        message: String,
        location: SourceLocation,
    },

    #[error("syntax error at {location}: {message}")]
    Parser {
        message: String,
        location: SourceLocation,
    },

    #[error("runtime error: {message}")]
    Runtime { message: String },

    #[error("runtime error at {location}: {message}")]
    RuntimeWithLocation {
        message: String,
        location: SourceLocation,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    pub fn lexer(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Lexer {
            message: message.into(),
            location: SourceLocation::new(line, column),
        }
    }

    pub fn parser(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Parser {
            message: message.into(),
            location,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    pub fn runtime_at(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::RuntimeWithLocation {
            message: message.into(),
            location,
        }
    }

    /// True for errors raised while executing a program
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Error::Runtime { .. } | Error::RuntimeWithLocation { .. } | Error::Regex(_)
        )
    }
}

/// Result type alias for mini-awk operations
pub type Result<T> = std::result::Result<T, Error>;
