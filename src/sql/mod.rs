// SQL Front-End Module
//
// Lexer, AST, and parser for the SQL dialect the transpiler accepts.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use self::ast::SelectStatement;
pub use self::lexer::{Lexer, Token, TokenType};
pub use self::parser::{ParseError, Parser};
