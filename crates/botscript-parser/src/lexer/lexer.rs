//! Main lexer implementation for BotScript.
//!
//! The [`Lexer`] converts source text into [`Token`]s, dispatching on the
//! first character of each token. Comments and whitespace are skipped.

use botscript_core::LexError;

use super::cursor::{Cursor, Mark, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

/// Lex a whole source text.
///
/// The returned tokens always end with a single [`TokenKind::Eof`].
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Lexer for BotScript source code.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let start = self.cursor.mark();
        match self.cursor.peek() {
            None => Ok(self.make_token(TokenKind::Eof, start)),
            Some('"') => self.scan_string(start),
            Some(c) if c.is_ascii_digit() => self.scan_number(start),
            Some(c) if is_ident_start(c) => Ok(self.scan_identifier(start)),
            Some(_) => self.scan_operator(start),
        }
    }

    fn make_token(&self, kind: TokenKind, start: Mark) -> Token {
        Token::new(
            kind,
            self.cursor.text_since(start),
            self.cursor.span_since(start),
        )
    }

    fn invalid_number(&self, start: Mark) -> LexError {
        LexError::InvalidNumber {
            span: self.cursor.span_since(start),
        }
    }

    /// Skip whitespace, line comments and block comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            self.cursor.eat_while(char::is_whitespace);

            if self.cursor.at("//") {
                self.cursor.eat_while(|c| c != '\n');
                continue;
            }
            let start = self.cursor.mark();
            if !self.cursor.eat_str("/*") {
                return Ok(());
            }
            while !self.cursor.eat_str("*/") {
                if self.cursor.at_eof() {
                    return Err(LexError::UnterminatedComment {
                        span: self.cursor.span_since(start),
                    });
                }
                self.cursor.bump();
            }
        }
    }

    fn scan_string(&mut self, start: Mark) -> Result<Token, LexError> {
        self.cursor.bump(); // opening quote

        loop {
            match self.cursor.bump() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString {
                        span: self.cursor.span_since(start),
                    });
                }
                Some('\\') => {
                    self.cursor.bump();
                }
                Some('"') => return Ok(self.make_token(TokenKind::StringLiteral, start)),
                Some(_) => {}
            }
        }
    }

    fn scan_number(&mut self, start: Mark) -> Result<Token, LexError> {
        if self.cursor.eat_str("0x") || self.cursor.eat_str("0X") {
            if self.cursor.eat_while(|c| c.is_ascii_hexdigit()).is_empty() {
                return Err(self.invalid_number(start));
            }
            return Ok(self.make_token(TokenKind::IntLiteral, start));
        }

        self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut is_float = false;

        if self.cursor.peek() == Some('.')
            && self.cursor.peek_second().is_some_and(|c| c.is_ascii_digit())
        {
            self.cursor.bump();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            is_float = true;
        }

        if self.cursor.eat('e') || self.cursor.eat('E') {
            if !self.cursor.eat('+') {
                self.cursor.eat('-');
            }
            if self.cursor.eat_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(self.invalid_number(start));
            }
            is_float = true;
        }

        if self.cursor.eat('f') || self.cursor.eat('F') {
            return Ok(self.make_token(TokenKind::FloatLiteral, start));
        }

        if self.cursor.peek().is_some_and(is_ident_start) {
            self.cursor.eat_while(is_ident_continue);
            return Err(self.invalid_number(start));
        }

        let kind = if is_float {
            TokenKind::DoubleLiteral
        } else {
            TokenKind::IntLiteral
        };
        Ok(self.make_token(kind, start))
    }

    fn scan_identifier(&mut self, start: Mark) -> Token {
        let lexeme = self.cursor.eat_while(is_ident_continue);
        let kind = lookup_keyword(lexeme).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start)
    }

    fn scan_operator(&mut self, start: Mark) -> Result<Token, LexError> {
        let ch = self.cursor.bump().unwrap_or('\0');
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '~' => TokenKind::Tilde,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => TokenKind::Equal,
            ':' if self.cursor.eat(':') => TokenKind::ColonColon,
            ch => {
                return Err(LexError::UnexpectedChar {
                    ch,
                    span: self.cursor.span_since(start),
                });
            }
        };
        Ok(self.make_token(kind, start))
    }
}

/// The value of an integer literal token.
pub fn int_value(lexeme: &str) -> Option<i64> {
    match lexeme
        .strip_prefix("0x")
        .or_else(|| lexeme.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => lexeme.parse().ok(),
    }
}

/// The value of a float or double literal token.
pub fn float_value(lexeme: &str) -> Option<f64> {
    lexeme.trim_end_matches(['f', 'F']).parse().ok()
}

/// The contents of a string literal token, quotes removed and escapes
/// resolved.
pub fn string_value(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
