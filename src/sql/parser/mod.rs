// SQL Parser Module
//
// Recursive-descent parser over the lexer's token stream, one submodule
// per concern: token plumbing, SELECT clauses, boolean conditions.

mod conditions;
mod core;
mod select;

pub use self::core::{ParseError, ParseResult, Parser};

use crate::sql::ast::SelectStatement;

impl Parser {
    /// Parse the input as a single SELECT statement
    pub fn parse_select(&mut self) -> ParseResult<SelectStatement> {
        select::parse_select(self)
    }
}

/// Parse a SQL string into a SelectStatement
pub fn parse(input: &str) -> ParseResult<SelectStatement> {
    Parser::new(input).parse_select()
}
