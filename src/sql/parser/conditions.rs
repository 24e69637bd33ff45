// Condition Parser Implementation
//
// Boolean expression grammar for the WHERE clause. Precedence is
// NOT > AND > OR, left-associative, with parentheses overriding:
//
//   or_expr   := and_expr (OR and_expr)*
//   and_expr  := not_expr (AND not_expr)*
//   not_expr  := NOT not_expr | primary
//   primary   := '(' or_expr ')' | predicate
//   predicate := column (op value | LIKE value | IN '(' values ')'
//                | IS [NOT] NULL)

use super::core::{ParseError, ParseResult, Parser};
use super::select::parse_column_ref;
use crate::sql::ast::{ComparisonOperator, Condition, Value};
use crate::sql::lexer::TokenType;

/// Parse a full boolean condition tree
pub fn parse_condition(parser: &mut Parser) -> ParseResult<Condition> {
    parse_or(parser)
}

fn parse_or(parser: &mut Parser) -> ParseResult<Condition> {
    let mut left = parse_and(parser)?;

    while parser.current_token_is(&TokenType::Or) {
        parser.next_token();
        let right = parse_and(parser)?;
        left = Condition::Or(Box::new(left), Box::new(right));
    }

    Ok(left)
}

fn parse_and(parser: &mut Parser) -> ParseResult<Condition> {
    let mut left = parse_not(parser)?;

    while parser.current_token_is(&TokenType::And) {
        parser.next_token();
        let right = parse_not(parser)?;
        left = Condition::And(Box::new(left), Box::new(right));
    }

    Ok(left)
}

fn parse_not(parser: &mut Parser) -> ParseResult<Condition> {
    if parser.current_token_is(&TokenType::Not) {
        parser.next_token();
        let inner = parse_not(parser)?;
        return Ok(Condition::Not(Box::new(inner)));
    }

    parse_primary(parser)
}

fn parse_primary(parser: &mut Parser) -> ParseResult<Condition> {
    if parser.current_token_is(&TokenType::LeftParen) {
        parser.next_token();
        let inner = parse_or(parser)?;
        parser.expect_token(TokenType::RightParen)?;
        return Ok(inner);
    }

    parse_predicate(parser)
}

/// Parse a single predicate on a column
fn parse_predicate(parser: &mut Parser) -> ParseResult<Condition> {
    let column = parse_column_ref(parser)?;

    // IS [NOT] NULL
    if parser.current_token_is(&TokenType::Is) {
        parser.next_token();
        let negated = if parser.current_token_is(&TokenType::Not) {
            parser.next_token();
            true
        } else {
            false
        };
        parser.expect_token(TokenType::Null)?;
        return Ok(Condition::IsNull { column, negated });
    }

    // IN (v1, v2, ...)
    if parser.current_token_is(&TokenType::In) {
        parser.next_token();
        parser.expect_token(TokenType::LeftParen)?;

        let mut values = vec![parse_value(parser)?];
        while parser.current_token_is(&TokenType::Comma) {
            parser.next_token();
            values.push(parse_value(parser)?);
        }

        parser.expect_token(TokenType::RightParen)?;
        return Ok(Condition::InList { column, values });
    }

    let operator = parse_comparison_operator(parser)?;
    let value = parse_value(parser)?;

    Ok(Condition::Comparison {
        column,
        operator,
        value,
    })
}

fn parse_comparison_operator(parser: &mut Parser) -> ParseResult<ComparisonOperator> {
    let operator = match parser.current_token.as_ref().map(|t| &t.token_type) {
        Some(TokenType::Equals) => ComparisonOperator::Equals,
        Some(TokenType::NotEqual) => ComparisonOperator::NotEquals,
        Some(TokenType::LessThan) => ComparisonOperator::LessThan,
        Some(TokenType::GreaterThan) => ComparisonOperator::GreaterThan,
        Some(TokenType::LessEqual) => ComparisonOperator::LessEquals,
        Some(TokenType::GreaterEqual) => ComparisonOperator::GreaterEquals,
        Some(TokenType::Like) => ComparisonOperator::Like,
        _ => return Err(parser.unexpected()),
    };

    parser.next_token();
    Ok(operator)
}

/// Parse a literal value
fn parse_value(parser: &mut Parser) -> ParseResult<Value> {
    let token = parser.current_token.clone().ok_or(ParseError::EndOfInput)?;

    let value = match token.token_type {
        TokenType::Integer(n) => Value::Integer(n),
        TokenType::Float(f) => Value::Float(f),
        TokenType::String(s) => Value::String(s),
        _ => return Err(parser.unexpected()),
    };

    parser.next_token();
    Ok(value)
}
