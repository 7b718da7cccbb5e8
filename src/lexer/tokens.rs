use std::fmt;

use crate::error::SourceLocation;

/// All token types of the language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals, carrying their source text
    Number(String),
    String(String),
    Pattern(String),

    // Names and keywords
    Word(String),
    Begin,
    End,
    If,
    Else,
    While,
    Do,
    For,
    In,
    Break,
    Continue,
    Function,
    Return,
    Delete,
    Exit,
    Next,
    Nextfile,
    Getline,
    Print,
    Printf,

    // Operators - Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    Caret,   // ^

    // Operators - Comparison
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=
    Equal,        // ==
    NotEqual,     // !=

    // Operators - Logical
    And, // &&
    Or,  // ||
    Not, // !

    // Operators - Regex
    Match,    // ~
    NotMatch, // !~

    // Operators - Assignment
    Assign,        // =
    PlusAssign,    // +=
    MinusAssign,   // -=
    StarAssign,    // *=
    SlashAssign,   // /=
    PercentAssign, // %=
    CaretAssign,   // ^=

    // Operators - Increment/Decrement
    Increment, // ++
    Decrement, // --

    // Special operators
    Dollar,   // $
    Question, // ?
    Colon,    // :
    Pipe,     // |
    Append,   // >>

    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,

    /// Statement terminator: a newline or `;`
    Separator,

    Eof,
}

impl TokenKind {
    /// Check if this token can start an expression
    pub fn can_start_expression(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Pattern(_)
                | TokenKind::Word(_)
                | TokenKind::LeftParen
                | TokenKind::Dollar
                | TokenKind::Not
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Increment
                | TokenKind::Decrement
                | TokenKind::Print
                | TokenKind::Printf
                | TokenKind::Getline
                | TokenKind::Next
                | TokenKind::Nextfile
                | TokenKind::Exit
        )
    }

    /// Source text of a fixed-spelling token
    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Begin => "BEGIN",
            TokenKind::End => "END",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::Delete => "delete",
            TokenKind::Exit => "exit",
            TokenKind::Next => "next",
            TokenKind::Nextfile => "nextfile",
            TokenKind::Getline => "getline",
            TokenKind::Print => "print",
            TokenKind::Printf => "printf",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Equal => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Not => "!",
            TokenKind::Match => "~",
            TokenKind::NotMatch => "!~",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::PercentAssign => "%=",
            TokenKind::CaretAssign => "^=",
            TokenKind::Increment => "++",
            TokenKind::Decrement => "--",
            TokenKind::Dollar => "$",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Pipe => "|",
            TokenKind::Append => ">>",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Separator => "\n",
            TokenKind::Eof => "",
            TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::Pattern(_)
            | TokenKind::Word(_) => "",
        }
    }
}

/// Renders the token back to source text that lexes to the same token
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(text) | TokenKind::Word(text) => f.write_str(text),
            TokenKind::String(text) => write!(f, "\"{}\"", text.replace('"', "\\\"")),
            TokenKind::Pattern(text) => write!(f, "`{}`", text.replace('`', "\\`")),
            other => f.write_str(other.symbol()),
        }
    }
}

/// A token with its location in the source
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            location: SourceLocation::new(line, column),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {:?}", self.location.line, self.location.column, self.kind)
    }
}

/// Map keyword strings to token kinds
pub fn keyword_to_token(s: &str) -> Option<TokenKind> {
    match s {
        "BEGIN" => Some(TokenKind::Begin),
        "END" => Some(TokenKind::End),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "while" => Some(TokenKind::While),
        "do" => Some(TokenKind::Do),
        "for" => Some(TokenKind::For),
        "in" => Some(TokenKind::In),
        "break" => Some(TokenKind::Break),
        "continue" => Some(TokenKind::Continue),
        "function" => Some(TokenKind::Function),
        "return" => Some(TokenKind::Return),
        "delete" => Some(TokenKind::Delete),
        "exit" => Some(TokenKind::Exit),
        "next" => Some(TokenKind::Next),
        "nextfile" => Some(TokenKind::Nextfile),
        "getline" => Some(TokenKind::Getline),
        "print" => Some(TokenKind::Print),
        "printf" => Some(TokenKind::Printf),
        _ => None,
    }
}
