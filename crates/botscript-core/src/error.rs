//! Error types for every phase of BotScript processing.
//!
//! ## Error Hierarchy
//!
//! ```text
//! LexError          - tokenization errors
//! CompileError      - signature/body compilation errors, keyed by ErrorCode
//! RuntimeError      - execution errors, keyed by RuntimeErrorCode
//! ```
//!
//! [`ErrorCode`] is the stable symbolic taxonomy surfaced to hosts. Call
//! resolution also reports through it, so a resolver that found no viable
//! overload picks exactly one code by a fixed precedence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Span;

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during lexical analysis (tokenization).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// An unexpected character was encountered.
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    /// A string literal was not properly terminated.
    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    /// A block comment was not properly terminated.
    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    /// A numeric literal could not be parsed.
    #[error("invalid number at {span}")]
    InvalidNumber { span: Span },
}

impl LexError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::UnterminatedComment { span } => *span,
            LexError::InvalidNumber { span } => *span,
        }
    }
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// Symbolic error codes for compilation and call resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ErrorCode {
    /// No function with a usable signature exists for a call.
    #[error("undefined function call")]
    UndefinedCall,
    /// A function name was expected.
    #[error("function name expected")]
    NoSuchFunctionName,
    /// A return type was expected.
    #[error("return type expected")]
    NoTypeForReturnValue,
    /// An argument cannot be converted to the parameter type.
    #[error("bad parameter type")]
    BadParameterType,
    /// More arguments than parameters.
    #[error("too many parameters")]
    TooManyParameters,
    /// Fewer arguments than parameters.
    #[error("too few parameters")]
    TooFewParameters,
    /// Overloads exist with both more and fewer parameters than provided.
    #[error("wrong number of parameters")]
    AmbiguousParameterCount,
    /// A function with the same signature already exists.
    #[error("function already defined")]
    Redefinition,
    /// The class named in a method declaration does not exist.
    #[error("unknown class")]
    UnknownClass,
    /// A function body must start with `{`.
    #[error("'{{' expected")]
    MissingOpenBlock,

    // Codes used by the parameter-list and statement-block compilers.
    #[error("'(' expected")]
    ExpectedOpenParen,
    #[error("')' expected")]
    ExpectedCloseParen,
    #[error("identifier expected")]
    ExpectedIdentifier,
    #[error("';' expected")]
    ExpectedSemicolon,
    #[error("variable already defined")]
    RedefinedVariable,
    #[error("unknown variable")]
    UnknownVariable,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("return value expected")]
    MissingReturnValue,
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("unexpected end of input")]
    UnexpectedEof,
}

impl ErrorCode {
    /// Whether this code is one of the argument-count diagnostics.
    pub fn is_count_mismatch(self) -> bool {
        matches!(
            self,
            ErrorCode::TooManyParameters
                | ErrorCode::TooFewParameters
                | ErrorCode::AmbiguousParameterCount
        )
    }
}

/// A compilation failure with its location.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("at {span}: {code}{}", .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
pub struct CompileError {
    pub code: ErrorCode,
    pub span: Span,
    /// Extra context such as the offending name.
    pub detail: Option<String>,
}

impl CompileError {
    pub fn new(code: ErrorCode, span: Span) -> Self {
        Self {
            code,
            span,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        let span = err.span();
        CompileError::new(ErrorCode::UnexpectedToken, span).with_detail(err.to_string())
    }
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Symbolic error codes raised while executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum RuntimeErrorCode {
    /// No function matched a call at runtime.
    #[error("undefined function call")]
    UndefinedCall,
    /// A method body needed `this` but no instance binding exists.
    #[error("no instance bound to 'this'")]
    MissingInstance,
    /// A frame refers to a function that is no longer loaded.
    #[error("unknown function")]
    UnknownFunction,
    #[error("unknown variable")]
    UnknownVariable,
    #[error("null reference")]
    NullReference,
    /// An object handle outlived its object.
    #[error("stale object handle")]
    StaleObject,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("call stack overflow")]
    StackOverflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// An execution failure, positioned when the position is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}{}", .span.map(|s| format!(" at {s}")).unwrap_or_default())]
pub struct RuntimeError {
    pub code: RuntimeErrorCode,
    pub span: Option<Span>,
}

impl RuntimeError {
    pub fn new(code: RuntimeErrorCode) -> Self {
        Self { code, span: None }
    }

    pub fn at(code: RuntimeErrorCode, span: Span) -> Self {
        Self {
            code,
            span: Some(span),
        }
    }

    /// Attach a position, replacing any earlier one.
    pub fn positioned(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display() {
        let err = CompileError::new(ErrorCode::Redefinition, Span::new(2, 6, 20, 21));
        assert_eq!(err.to_string(), "at 2:6: function already defined");

        let err = err.with_detail("g");
        assert_eq!(err.to_string(), "at 2:6: function already defined (g)");
    }

    #[test]
    fn runtime_error_display() {
        let err = RuntimeError::new(RuntimeErrorCode::UndefinedCall);
        assert_eq!(err.to_string(), "undefined function call");
        let err = err.positioned(Span::new(4, 1, 30, 31));
        assert_eq!(err.to_string(), "undefined function call at 4:1");
    }

    #[test]
    fn lex_error_converts_with_span() {
        let span = Span::new(1, 3, 2, 3);
        let err: CompileError = LexError::UnexpectedChar { ch: '$', span }.into();
        assert_eq!(err.code, ErrorCode::UnexpectedToken);
        assert_eq!(err.span, span);
    }

    #[test]
    fn count_mismatch_codes() {
        assert!(ErrorCode::TooFewParameters.is_count_mismatch());
        assert!(ErrorCode::AmbiguousParameterCount.is_count_mismatch());
        assert!(!ErrorCode::BadParameterType.is_count_mismatch());
    }
}
