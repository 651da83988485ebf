//! Source location tracking for error reporting and tooling.
//!
//! Provides [`Span`] to track where tokens and errors occur in source code,
//! and [`FunctionPositions`] for the five named regions of a function
//! declaration that editors and diagnostics ask for.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A span of source code.
///
/// Carries the line:column of its first byte for messages and the byte
/// offsets `start..end` for tooling.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Byte offset of the first byte.
    pub start: u32,
    /// Byte offset one past the last byte.
    pub end: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, start: u32, end: u32) -> Self {
        Self {
            line,
            col,
            start,
            end,
        }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32, offset: u32) -> Self {
        Self::new(line, col, offset, offset)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The length of this span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Extend this span so it also covers `other`.
    ///
    /// The line and column stay those of whichever span starts first.
    #[inline]
    pub fn to(self, other: Span) -> Span {
        let first = if other.start < self.start { other } else { self };
        Span {
            line: first.line,
            col: first.col,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Named regions of a function declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRegion {
    /// The `extern` keyword.
    Extern,
    /// The function name.
    Name,
    /// The parameter list, parentheses included.
    Params,
    /// The body block, braces included.
    Body,
    /// The whole declaration, modifiers included.
    Whole,
}

/// Start/end offsets for each named region of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionPositions {
    /// The `extern` keyword, when present.
    pub extern_kw: Option<Span>,
    pub name: Span,
    pub params: Span,
    pub body: Span,
    pub whole: Span,
}

impl FunctionPositions {
    /// The span of one region.
    ///
    /// A function declared without `extern` reports its whole declaration for
    /// the extern region.
    pub fn region(&self, region: SourceRegion) -> Span {
        match region {
            SourceRegion::Extern => self.extern_kw.unwrap_or(self.whole),
            SourceRegion::Name => self.name,
            SourceRegion::Params => self.params,
            SourceRegion::Body => self.body,
            SourceRegion::Whole => self.whole,
        }
    }

    /// Byte range from the start of `start` to the end of `stop`.
    pub fn range(&self, start: SourceRegion, stop: SourceRegion) -> (u32, u32) {
        (self.region(start).start, self.region(stop).end)
    }
}
