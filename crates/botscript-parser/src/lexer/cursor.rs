use botscript_core::Span;

/// A position in the source, taken before scanning a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    offset: u32,
    line: u32,
    line_start: u32,
}

impl Mark {
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// 1-indexed, in bytes.
    pub fn column(&self) -> u32 {
        self.offset - self.line_start + 1
    }
}

/// Byte-wise scanner over BotScript source.
///
/// Only line starts are tracked while scanning; columns are worked out when
/// a [`Span`] is built.
pub struct Cursor<'src> {
    source: &'src str,
    pos: Mark,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: Mark {
                offset: 0,
                line: 1,
                line_start: 0,
            },
        }
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos.offset as usize..]
    }

    pub fn mark(&self) -> Mark {
        self.pos
    }

    /// The source between `mark` and the current position.
    pub fn text_since(&self, mark: Mark) -> &'src str {
        &self.source[mark.offset as usize..self.pos.offset as usize]
    }

    /// A span from `mark` to the current position.
    pub fn span_since(&self, mark: Mark) -> Span {
        Span::new(mark.line, mark.column(), mark.offset(), self.pos.offset)
    }

    pub fn at_eof(&self) -> bool {
        self.pos.offset as usize >= self.source.len()
    }

    /// Whether the remaining source starts with `text`.
    pub fn at(&self, text: &str) -> bool {
        self.rest().starts_with(text)
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The character after the current one.
    pub fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    /// Step over one character.
    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos.offset += ch.len_utf8() as u32;
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.line_start = self.pos.offset;
        }
        Some(ch)
    }

    /// Step over `text` if the source continues with it.
    pub fn eat_str(&mut self, text: &str) -> bool {
        if !self.at(text) {
            return false;
        }
        for _ in text.chars() {
            self.bump();
        }
        true
    }

    pub fn eat(&mut self, ch: char) -> bool {
        self.peek() == Some(ch) && self.bump().is_some()
    }

    /// Step over the longest run of characters accepted by `accept` and
    /// return it.
    pub fn eat_while(&mut self, accept: impl Fn(char) -> bool) -> &'src str {
        let mark = self.mark();
        while self.peek().is_some_and(&accept) {
            self.bump();
        }
        self.text_since(mark)
    }
}

pub fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

pub fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}
