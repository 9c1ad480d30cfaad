pub mod lexer;
pub mod token;
pub mod token_dumper;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};
