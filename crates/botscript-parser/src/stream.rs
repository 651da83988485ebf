//! A cursor over lexed tokens.
//!
//! Both compiler passes read declarations through a [`TokenStream`]. Pass 1
//! does not compile bodies; it jumps over them with [`skip_block`] and
//! remembers the position so pass 2 can come back.

use std::sync::OnceLock;

use botscript_core::{CompileError, ErrorCode, Span};

use crate::lexer::{Token, TokenKind};

/// A cursor over a token slice.
///
/// Reading past the end keeps returning the final end-of-file token.
#[derive(Debug, Clone)]
pub struct TokenStream<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenStream<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// The current token.
    #[inline]
    pub fn peek(&self) -> &'t Token {
        self.peek_nth(0)
    }

    /// The token `n` positions ahead (0 = current).
    pub fn peek_nth(&self, n: usize) -> &'t Token {
        self.tokens
            .get(self.pos + n)
            .unwrap_or_else(|| end_of_input())
    }

    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Consume the current token.
    pub fn advance(&mut self) -> &'t Token {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind != TokenKind::Eof => {
                self.pos += 1;
                token
            }
            Some(token) => token,
            None => end_of_input(),
        }
    }

    /// Consume the current token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Option<&'t Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume a token of the given kind or fail with `code`.
    pub fn expect(&mut self, kind: TokenKind, code: ErrorCode) -> Result<&'t Token, CompileError> {
        self.eat(kind)
            .ok_or_else(|| CompileError::new(code, self.peek().span))
    }

    /// The most recently consumed token.
    pub fn previous(&self) -> Option<&'t Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Jump back (or forward) to a position returned by [`position`](Self::position).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    /// Span from `start` to the end of the last consumed token.
    pub fn span_since(&self, start: Span) -> Span {
        match self.previous() {
            Some(last) => start.to(last.span),
            None => start,
        }
    }
}

/// Stand-in for slices that were not produced by the lexer and lack a
/// trailing end-of-file token.
fn end_of_input() -> &'static Token {
    static EOF: OnceLock<Token> = OnceLock::new();
    EOF.get_or_init(|| Token::new(TokenKind::Eof, "", Span::default()))
}

/// Skip a balanced `{ ... }` block.
///
/// The stream must be positioned on the opening brace. A nesting counter
/// goes up on every `{` and down on every `}`; the block ends when it reaches
/// zero. Returns the span of the whole block, braces included.
pub fn skip_block(stream: &mut TokenStream<'_>) -> Result<Span, CompileError> {
    let open = stream.expect(TokenKind::LeftBrace, ErrorCode::MissingOpenBlock)?;
    let start = open.span;
    let mut depth = 1usize;

    while depth > 0 {
        let token = stream.advance();
        match token.kind {
            TokenKind::LeftBrace => depth += 1,
            TokenKind::RightBrace => depth -= 1,
            TokenKind::Eof => {
                return Err(CompileError::new(ErrorCode::UnexpectedEof, token.span)
                    .with_detail("unclosed block"));
            }
            _ => {}
        }
    }

    Ok(stream.span_since(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn peek_and_advance() {
        let tokens = tokenize("a b").unwrap();
        let mut stream = TokenStream::new(&tokens);
        assert_eq!(stream.peek().lexeme, "a");
        assert_eq!(stream.peek_nth(1).lexeme, "b");
        stream.advance();
        assert_eq!(stream.previous().map(|t| t.lexeme.as_str()), Some("a"));
        stream.advance();
        assert!(stream.is_at_end());
        stream.advance();
        assert!(stream.is_at_end());
    }

    #[test]
    fn expect_reports_position() {
        let tokens = tokenize("x").unwrap();
        let mut stream = TokenStream::new(&tokens);
        let err = stream
            .expect(TokenKind::LeftParen, ErrorCode::ExpectedOpenParen)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ExpectedOpenParen);
        assert_eq!(err.span.col, 1);
    }

    #[test]
    fn seek_restores_position() {
        let tokens = tokenize("a b c").unwrap();
        let mut stream = TokenStream::new(&tokens);
        stream.advance();
        let mark = stream.position();
        stream.advance();
        stream.seek(mark);
        assert_eq!(stream.peek().lexeme, "b");
    }

    #[test]
    fn skip_nested_block() {
        let tokens = tokenize("{ a { b { } } c } next").unwrap();
        let mut stream = TokenStream::new(&tokens);
        let span = skip_block(&mut stream).unwrap();
        assert_eq!(stream.peek().lexeme, "next");
        assert_eq!((span.start, span.end), (0, 17));
    }

    #[test]
    fn skip_requires_open_brace() {
        let tokens = tokenize("a }").unwrap();
        let mut stream = TokenStream::new(&tokens);
        let err = skip_block(&mut stream).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingOpenBlock);
    }

    #[test]
    fn skip_unclosed_block_fails() {
        let tokens = tokenize("{ a { }").unwrap();
        let mut stream = TokenStream::new(&tokens);
        let err = skip_block(&mut stream).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedEof);
    }
}
