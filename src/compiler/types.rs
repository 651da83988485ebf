//! Type names in declarations.

use botscript_core::DataType;
use botscript_parser::{TokenKind, TokenStream};
use botscript_registry::ClassRegistry;

/// Whether the current token starts a type name.
pub fn starts_type(stream: &TokenStream<'_>, classes: &ClassRegistry) -> bool {
    let token = stream.peek();
    token.kind.is_primitive_type()
        || (token.kind == TokenKind::Identifier && classes.contains(&token.lexeme))
}

/// Parse a type: a primitive keyword or a registered class name, followed
/// by any number of `[]`.
///
/// Returns `None` without consuming anything when the current token does not
/// start a type.
pub fn parse_type(stream: &mut TokenStream<'_>, classes: &ClassRegistry) -> Option<DataType> {
    if !starts_type(stream, classes) {
        return None;
    }
    let token = stream.advance();
    let mut ty = match token.kind.primitive_type() {
        Some(kind) => DataType::primitive(kind),
        None => DataType::class(token.lexeme.clone()),
    };

    while stream.check(TokenKind::LeftBracket)
        && stream.peek_nth(1).kind == TokenKind::RightBracket
    {
        stream.advance();
        stream.advance();
        ty = DataType::array(ty);
    }
    Some(ty)
}
