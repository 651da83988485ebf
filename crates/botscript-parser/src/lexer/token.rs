//! Token types and definitions for the BotScript lexer.

use std::fmt;

use botscript_core::{Span, TypeKind};

/// A token from the source code.
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The type of token.
    pub kind: TokenKind,
    /// The source text of this token.
    pub lexeme: String,
    /// Location in source.
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

/// All possible token types in BotScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// Integer literal: `42`, `0xFF`
    IntLiteral,
    /// Float literal: `3.14f`
    FloatLiteral,
    /// Double literal: `3.14`, `1.0e10`
    DoubleLiteral,
    /// String literal: `"hello"`
    StringLiteral,

    /// User-defined identifier
    Identifier,

    // =========================================
    // Keywords - Types
    // =========================================
    Void,
    Bool,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,

    // =========================================
    // Keywords - Values
    // =========================================
    True,
    False,
    Null,
    This,
    Super,

    // =========================================
    // Keywords - Declarations and statements
    // =========================================
    Public,
    Extern,
    Synchronized,
    Private,
    Class,
    Return,
    Wait,

    // =========================================
    // Punctuation and operators
    // =========================================
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    /// `::`
    ColonColon,
    /// `~`, the destructor marker
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Equal,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Check if this token kind names a primitive type.
    pub fn is_primitive_type(self) -> bool {
        self.primitive_type().is_some()
    }

    /// The primitive type named by this keyword.
    pub fn primitive_type(self) -> Option<TypeKind> {
        Some(match self {
            TokenKind::Void => TypeKind::Void,
            TokenKind::Bool => TypeKind::Bool,
            TokenKind::Byte => TypeKind::Byte,
            TokenKind::Short => TypeKind::Short,
            TokenKind::Char => TypeKind::Char,
            TokenKind::Int => TypeKind::Int,
            TokenKind::Long => TypeKind::Long,
            TokenKind::Float => TypeKind::Float,
            TokenKind::Double => TypeKind::Double,
            TokenKind::String => TypeKind::String,
            _ => return None,
        })
    }

    /// Check if this token is a literal.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::DoubleLiteral
                | TokenKind::StringLiteral
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Declaration modifiers accepted before a function's return type.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Public | TokenKind::Extern | TokenKind::Synchronized | TokenKind::Private
        )
    }

    /// Get a human-readable description of this token kind.
    pub fn description(self) -> &'static str {
        use TokenKind::*;
        match self {
            IntLiteral => "integer literal",
            FloatLiteral => "float literal",
            DoubleLiteral => "double literal",
            StringLiteral => "string literal",
            Identifier => "identifier",
            Void => "void",
            Bool => "bool",
            Byte => "byte",
            Short => "short",
            Char => "char",
            Int => "int",
            Long => "long",
            Float => "float",
            Double => "double",
            String => "string",
            True => "true",
            False => "false",
            Null => "null",
            This => "this",
            Super => "super",
            Public => "public",
            Extern => "extern",
            Synchronized => "synchronized",
            Private => "private",
            Class => "class",
            Return => "return",
            Wait => "wait",
            LeftParen => "(",
            RightParen => ")",
            LeftBrace => "{",
            RightBrace => "}",
            LeftBracket => "[",
            RightBracket => "]",
            Semicolon => ";",
            Comma => ",",
            Dot => ".",
            ColonColon => "::",
            Tilde => "~",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Equal => "=",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Look up a keyword by its string representation.
///
/// Returns `None` if the string is not a keyword.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        // Types
        "void" => Void,
        "bool" | "boolean" => Bool,
        "byte" => Byte,
        "short" => Short,
        "char" => Char,
        "int" => Int,
        "long" => Long,
        "float" => Float,
        "double" => Double,
        "string" => String,

        // Values
        "true" => True,
        "false" => False,
        "null" => Null,
        "this" => This,
        "super" => Super,

        // Declarations and statements
        "public" => Public,
        "extern" => Extern,
        "synchronized" => Synchronized,
        "private" => Private,
        "class" => Class,
        "return" => Return,
        "wait" => Wait,

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(lookup_keyword("synchronized"), Some(TokenKind::Synchronized));
        assert_eq!(lookup_keyword("boolean"), Some(TokenKind::Bool));
        assert_eq!(lookup_keyword("robot"), None);
    }

    #[test]
    fn primitive_types() {
        assert_eq!(TokenKind::Float.primitive_type(), Some(TypeKind::Float));
        assert_eq!(TokenKind::Void.primitive_type(), Some(TypeKind::Void));
        assert!(!TokenKind::Identifier.is_primitive_type());
    }

    #[test]
    fn modifiers() {
        assert!(TokenKind::Public.is_modifier());
        assert!(TokenKind::Extern.is_modifier());
        assert!(!TokenKind::Class.is_modifier());
    }

    #[test]
    fn display_uses_description() {
        assert_eq!(TokenKind::LeftBrace.to_string(), "{");
        assert_eq!(TokenKind::Eof.to_string(), "end of file");
    }
}
