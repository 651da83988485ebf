//! BotScript parser crate.
//!
//! Provides the lexer and the token cursor the compiler reads declarations
//! through:
//! - Lexical analysis ([`tokenize`])
//! - [`TokenStream`], a seekable cursor over the lexed tokens
//! - [`skip_block`], the balanced-brace scan pass 1 uses to step over bodies
//!
//! # Example
//!
//! ```
//! use botscript_parser::{TokenKind, TokenStream, skip_block, tokenize};
//!
//! let tokens = tokenize("void f() { if { } } int g;").unwrap();
//! let mut stream = TokenStream::new(&tokens);
//! stream.advance(); // void
//! stream.advance(); // f
//! stream.advance(); // (
//! stream.advance(); // )
//! skip_block(&mut stream).unwrap();
//! assert_eq!(stream.peek().kind, TokenKind::Int);
//! ```

pub mod lexer;
pub mod stream;

pub use lexer::{Lexer, Token, TokenKind, float_value, int_value, string_value, tokenize};
pub use stream::{TokenStream, skip_block};
