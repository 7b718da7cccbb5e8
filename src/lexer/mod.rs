mod tokens;

pub use tokens::{Token, TokenKind, keyword_to_token};

use crate::error::{Error, Result};

/// Lexer that turns source text into tokens
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire source, returning all tokens ending with `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let estimated_tokens = self.source.len() / 4 + 1;
        let mut tokens = Vec::with_capacity(estimated_tokens.min(1024));

        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tracing::debug!(count = tokens.len(), "tokenized source");
        Ok(tokens)
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let (line, col) = (self.line, self.column);

        let Some((_pos, ch)) = self.peek_char() else {
            return Ok(Token::new(TokenKind::Eof, line, col));
        };

        let token = match ch {
            '\n' | ';' => {
                self.advance();
                Token::new(TokenKind::Separator, line, col)
            }

            '"' => self.scan_quoted('"')?,
            '`' => self.scan_quoted('`')?,

            '.' if self.peek_next_is_digit() => self.scan_number()?,
            '0'..='9' => self.scan_number()?,

            'a'..='z' | 'A'..='Z' => self.scan_word(),

            '+' => self.one_of(TokenKind::Plus, &[('+', TokenKind::Increment), ('=', TokenKind::PlusAssign)]),
            '-' => self.one_of(TokenKind::Minus, &[('-', TokenKind::Decrement), ('=', TokenKind::MinusAssign)]),
            '*' => self.one_of(TokenKind::Star, &[('=', TokenKind::StarAssign)]),
            '/' => self.one_of(TokenKind::Slash, &[('=', TokenKind::SlashAssign)]),
            '%' => self.one_of(TokenKind::Percent, &[('=', TokenKind::PercentAssign)]),
            '^' => self.one_of(TokenKind::Caret, &[('=', TokenKind::CaretAssign)]),
            '<' => self.one_of(TokenKind::Less, &[('=', TokenKind::LessEqual)]),
            '>' => self.one_of(
                TokenKind::Greater,
                &[('=', TokenKind::GreaterEqual), ('>', TokenKind::Append)],
            ),
            '=' => self.one_of(TokenKind::Assign, &[('=', TokenKind::Equal)]),
            '!' => self.one_of(TokenKind::Not, &[('=', TokenKind::NotEqual), ('~', TokenKind::NotMatch)]),
            '|' => self.one_of(TokenKind::Pipe, &[('|', TokenKind::Or)]),
            '&' => {
                self.advance();
                if !self.peek_char_is('&') {
                    return Err(Error::lexer("unexpected '&', did you mean '&&'?", line, col));
                }
                self.advance();
                Token::new(TokenKind::And, line, col)
            }

            '~' => self.single(TokenKind::Match),
            '$' => self.single(TokenKind::Dollar),
            '?' => self.single(TokenKind::Question),
            ':' => self.single(TokenKind::Colon),
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            ',' => self.single(TokenKind::Comma),

            _ => {
                return Err(Error::lexer(
                    format!("unexpected character '{}'", ch),
                    line,
                    col,
                ));
            }
        };

        Ok(token)
    }

    /// Consume one character and produce `kind`
    fn single(&mut self, kind: TokenKind) -> Token {
        let (line, col) = (self.line, self.column);
        self.advance();
        Token::new(kind, line, col)
    }

    /// Maximal munch: consume one character, then a second one if it forms a
    /// two-character operator listed in `pairs`
    fn one_of(&mut self, single: TokenKind, pairs: &[(char, TokenKind)]) -> Token {
        let (line, col) = (self.line, self.column);
        self.advance();
        for (second, kind) in pairs {
            if self.peek_char_is(*second) {
                self.advance();
                return Token::new(kind.clone(), line, col);
            }
        }
        Token::new(single, line, col)
    }

    fn peek_char(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn peek_char_is(&mut self, expected: char) -> bool {
        self.chars.peek().map(|(_, c)| *c == expected).unwrap_or(false)
    }

    fn peek_next_is_digit(&self) -> bool {
        let mut chars = self.chars.clone();
        chars.next(); // skip current
        chars.next().map(|(_, c)| c.is_ascii_digit()).unwrap_or(false)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((_, ch)) = result {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some((_, ' ' | '\t' | '\r')) => {
                    self.advance();
                }
                Some((_, '#')) => {
                    // Comment runs to end of line; the newline itself is kept
                    while let Some((_, ch)) = self.peek_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Scan a string (`"`) or pattern (`` ` ``) literal.
    ///
    /// Only the escaped delimiter is translated; every other character,
    /// backslashes included, is kept verbatim.
    fn scan_quoted(&mut self, delimiter: char) -> Result<Token> {
        let (line, col) = (self.line, self.column);
        self.advance(); // consume opening delimiter

        let what = if delimiter == '"' { "string" } else { "pattern" };
        let mut value = String::new();

        loop {
            match self.advance() {
                Some((_, c)) if c == delimiter => break,
                Some((_, '\\')) if self.peek_char_is(delimiter) => {
                    self.advance();
                    value.push(delimiter);
                }
                Some((_, ch)) => value.push(ch),
                None => {
                    return Err(Error::lexer(format!("unterminated {}", what), line, col));
                }
            }
        }

        let kind = if delimiter == '"' {
            TokenKind::String(value)
        } else {
            TokenKind::Pattern(value)
        };
        Ok(Token::new(kind, line, col))
    }

    fn scan_number(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.column);
        let start_pos = self.chars.peek().map(|(pos, _)| *pos).unwrap_or(0);
        let mut end_pos = start_pos;
        let mut seen_dot = false;

        while let Some((pos, ch)) = self.peek_char() {
            if ch.is_ascii_digit() {
                end_pos = pos + 1;
                self.advance();
            } else if ch == '.' {
                if seen_dot {
                    return Err(Error::lexer(
                        "malformed number: more than one decimal point",
                        self.line,
                        self.column,
                    ));
                }
                seen_dot = true;
                end_pos = pos + 1;
                self.advance();
            } else if ch.is_alphabetic() {
                return Err(Error::lexer(
                    format!("malformed number: unexpected '{}' after digits", ch),
                    self.line,
                    self.column,
                ));
            } else {
                break;
            }
        }

        let text = self.source[start_pos..end_pos].to_string();
        Ok(Token::new(TokenKind::Number(text), line, col))
    }

    fn scan_word(&mut self) -> Token {
        let (line, col) = (self.line, self.column);
        let start_pos = self.chars.peek().map(|(pos, _)| *pos).unwrap_or(0);
        let mut end_pos = start_pos;

        while let Some((pos, ch)) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                end_pos = pos + 1;
                self.advance();
            } else {
                break;
            }
        }

        let word = &self.source[start_pos..end_pos];
        let kind = keyword_to_token(word).unwrap_or_else(|| TokenKind::Word(word.to_string()));

        Token::new(kind, line, col)
    }
}
