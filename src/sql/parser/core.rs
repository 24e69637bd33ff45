// Core Parser Implementation
//
// Token-stream plumbing shared by the clause parsers: cursor management,
// expectation helpers, and the parse error taxonomy.

use std::iter::Peekable;
use std::vec::IntoIter;

use thiserror::Error;

use crate::sql::lexer::{Lexer, Token, TokenType};

/// SQL parsing errors. Every variant that points at source text carries
/// the offending token's literal and its 1-based position so the host
/// can underline it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected token '{literal}' at line {line}, column {column}")]
    UnexpectedToken {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("expected {expected}, found '{literal}' at line {line}, column {column}")]
    ExpectedToken {
        expected: String,
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("unexpected end of input")]
    EndOfInput,
    #[error(
        "row limit given twice: {first_clause} at line {first_line}, column {first_column} \
         and {second_clause} at line {second_line}, column {second_column}"
    )]
    DuplicateLimit {
        first_clause: String,
        first_line: usize,
        first_column: usize,
        second_clause: String,
        second_line: usize,
        second_column: usize,
    },
    #[error("row limit must be a positive integer, got '{literal}' at line {line}, column {column}")]
    InvalidLimit {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error(
        "unknown table qualifier '{qualifier}' at line {line}, column {column}; \
         qualifiers must name the FROM table or a join alias"
    )]
    UnknownQualifier {
        qualifier: String,
        line: usize,
        column: usize,
    },
    #[error("GROUP BY is required when aggregates are mixed with plain columns")]
    MissingGroupBy,
    #[error("trailing input after statement: '{literal}' at line {line}, column {column}")]
    TrailingInput {
        literal: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Position of the offending token, when the variant carries one.
    /// Duplicate-limit errors report the second clause's position.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::UnexpectedToken { line, column, .. }
            | ParseError::ExpectedToken { line, column, .. }
            | ParseError::InvalidLimit { line, column, .. }
            | ParseError::UnknownQualifier { line, column, .. }
            | ParseError::TrailingInput { line, column, .. } => Some((*line, *column)),
            ParseError::DuplicateLimit {
                second_line,
                second_column,
                ..
            } => Some((*second_line, *second_column)),
            ParseError::EndOfInput | ParseError::MissingGroupBy => None,
        }
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// SQL parser constructing a SelectStatement from lexer tokens
pub struct Parser {
    pub(crate) tokens: Peekable<IntoIter<Token>>,
    pub(crate) current_token: Option<Token>,
    /// Qualified column references seen while parsing, with the position
    /// of the qualifier token; resolved against the alias set once the
    /// whole statement has been read.
    pub(crate) qualified_refs: Vec<(String, usize, usize)>,
}

impl Parser {
    /// Create a new parser from a SQL query string
    pub fn new(input: &str) -> Self {
        let tokens = Lexer::tokenize(input);

        let mut parser = Parser {
            tokens: tokens.into_iter().peekable(),
            current_token: None,
            qualified_refs: Vec::new(),
        };

        parser.next_token();
        parser
    }

    /// Advance to the next token
    pub(crate) fn next_token(&mut self) -> Option<Token> {
        self.current_token = self.tokens.next();
        self.current_token.clone()
    }

    /// Peek at the next token without consuming it
    pub(crate) fn peek_token(&mut self) -> Option<&Token> {
        self.tokens.peek()
    }

    /// Check if the current token is of the given type. Literal and
    /// identifier variants match on kind, not payload.
    pub(crate) fn current_token_is(&self, token_type: &TokenType) -> bool {
        match &self.current_token {
            Some(token) => matches_token_type(&token.token_type, token_type),
            None => false,
        }
    }

    /// Consume the current token if it matches, otherwise error
    pub(crate) fn expect_token(&mut self, expected: TokenType) -> ParseResult<Token> {
        match self.current_token.clone() {
            Some(token) if matches_token_type(&token.token_type, &expected) => {
                self.next_token();
                Ok(token)
            }
            Some(token) if token.token_type == TokenType::Eof => Err(ParseError::EndOfInput),
            Some(token) => Err(ParseError::ExpectedToken {
                expected: describe_token_type(&expected),
                literal: token.literal,
                line: token.line,
                column: token.column,
            }),
            None => Err(ParseError::EndOfInput),
        }
    }

    /// Consume the current token if it is an identifier, returning its text
    pub(crate) fn expect_identifier(&mut self) -> ParseResult<(String, usize, usize)> {
        match self.current_token.clone() {
            Some(Token {
                token_type: TokenType::Identifier(name),
                line,
                column,
                ..
            }) => {
                self.next_token();
                Ok((name, line, column))
            }
            Some(token) if token.token_type == TokenType::Eof => Err(ParseError::EndOfInput),
            Some(token) => Err(ParseError::ExpectedToken {
                expected: "identifier".to_string(),
                literal: token.literal,
                line: token.line,
                column: token.column,
            }),
            None => Err(ParseError::EndOfInput),
        }
    }

    /// Error pointing at the current token
    pub(crate) fn unexpected(&self) -> ParseError {
        match &self.current_token {
            Some(token) if token.token_type == TokenType::Eof => ParseError::EndOfInput,
            Some(token) => ParseError::UnexpectedToken {
                literal: token.literal.clone(),
                line: token.line,
                column: token.column,
            },
            None => ParseError::EndOfInput,
        }
    }
}

/// Match token types by discriminant; payload-carrying variants compare
/// on kind only.
pub(crate) fn matches_token_type(actual: &TokenType, expected: &TokenType) -> bool {
    match (actual, expected) {
        (TokenType::Identifier(_), TokenType::Identifier(_)) => true,
        (TokenType::String(_), TokenType::String(_)) => true,
        (TokenType::Integer(_), TokenType::Integer(_)) => true,
        (TokenType::Float(_), TokenType::Float(_)) => true,
        (TokenType::Unknown(_), TokenType::Unknown(_)) => true,
        (a, e) => a == e,
    }
}

/// Human-readable token type name for diagnostics
pub(crate) fn describe_token_type(token_type: &TokenType) -> String {
    match token_type {
        TokenType::Identifier(_) => "identifier".to_string(),
        TokenType::String(_) => "string literal".to_string(),
        TokenType::Integer(_) => "integer literal".to_string(),
        TokenType::Float(_) => "number literal".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}
