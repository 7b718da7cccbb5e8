//! mini-awk - a small pattern-action scripting language in the AWK family
//!
//! Source text goes through three stages: the [`Lexer`] turns it into tokens,
//! the [`Parser`] builds a [`Program`], and the [`Interpreter`] walks that
//! program over a list of input records.
//!
//! # Example
//!
//! ```
//! use mini_awk::{Lexer, Parser, Interpreter};
//!
//! let source = r#"BEGIN { print "Hello, World!" }"#;
//! let mut lexer = Lexer::new(source);
//! let tokens = lexer.tokenize().unwrap();
//! let mut parser = Parser::new(tokens);
//! let program = parser.parse().unwrap();
//!
//! let mut interpreter = Interpreter::new(&program);
//! let mut output = Vec::new();
//! interpreter.run(Vec::new(), &mut output).unwrap();
//!
//! assert_eq!(String::from_utf8(output).unwrap(), "Hello, World!\n");
//! ```
//!
//! # Field Processing Example
//!
//! ```
//! use mini_awk::{Lexer, Parser, Interpreter};
//!
//! let source = r#"{ print $1 "-" $2 }"#;
//! let tokens = Lexer::new(source).tokenize().unwrap();
//! let program = Parser::new(tokens).parse().unwrap();
//!
//! let mut interpreter = Interpreter::new(&program);
//! interpreter.set_fs(",");
//!
//! let records = vec!["hello,world".to_string(), "foo,bar".to_string()];
//! let mut output = Vec::new();
//! interpreter.run(records, &mut output).unwrap();
//!
//! assert_eq!(String::from_utf8(output).unwrap(), "hello-world\nfoo-bar\n");
//! ```
//!
//! # Pattern Matching Example
//!
//! ```
//! let program = mini_awk::parse(mini_awk::tokenize("`error` { print \"Found: \" $0 }").unwrap()).unwrap();
//!
//! let records = vec!["info: ok".to_string(), "error: failed".to_string()];
//! let mut output = Vec::new();
//! mini_awk::run(&program, records, &mut output).unwrap();
//!
//! assert_eq!(String::from_utf8(output).unwrap(), "Found: error: failed\n");
//! ```

use std::io::Write;

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::Program;
pub use error::{Error, Result, SourceLocation};
pub use interpreter::{Interpreter, read_records};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use value::{Value, Variable};

/// Tokenize source text
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

/// Parse a token stream into a program
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    Parser::new(tokens).parse()
}

/// Run a program over `records` with default settings, returning its exit code
pub fn run<W: Write>(program: &Program, records: Vec<String>, output: &mut W) -> Result<i32> {
    Interpreter::new(program).run(records, output)
}
