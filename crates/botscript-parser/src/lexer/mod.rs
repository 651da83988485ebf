//! Lexical analysis for BotScript.

mod cursor;
mod lexer;
mod token;

pub use lexer::{Lexer, float_value, int_value, string_value, tokenize};
pub use token::{Token, TokenKind, lookup_keyword};
