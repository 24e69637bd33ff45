// SELECT Statement Parser Implementation
//
// One function per clause: select list, FROM, JOINs, WHERE (delegated to
// the condition parser), GROUP BY, ORDER BY, and the row limit. Qualifier
// resolution against the FROM table and join aliases happens here, after
// the whole statement has been read, so bad references fail at parse time.

use std::collections::HashSet;

use log::trace;

use super::conditions::parse_condition;
use super::core::{ParseError, ParseResult, Parser};
use crate::sql::ast::*;
use crate::sql::lexer::TokenType;

/// Row-limit clause bookkeeping for duplicate detection
struct LimitSpec {
    value: u32,
    clause: &'static str,
    line: usize,
    column: usize,
}

/// Parse a complete SELECT statement
pub fn parse_select(parser: &mut Parser) -> ParseResult<SelectStatement> {
    parser.expect_token(TokenType::Select)?;

    let distinct = if parser.current_token_is(&TokenType::Distinct) {
        parser.next_token();
        true
    } else {
        false
    };

    // T-SQL style TOP directly after SELECT
    let mut limit: Option<LimitSpec> = None;
    if parser.current_token_is(&TokenType::Top) {
        limit = Some(parse_limit_clause(parser, None)?);
    }

    let (columns, wildcard) = parse_select_list(parser)?;

    parser.expect_token(TokenType::From)?;
    let from = parse_table_ref(parser)?;

    let mut joins = Vec::new();
    while parser.current_token_is(&TokenType::Join)
        || parser.current_token_is(&TokenType::Inner)
        || parser.current_token_is(&TokenType::Left)
    {
        joins.push(parse_join_clause(parser)?);
    }

    let where_clause = if parser.current_token_is(&TokenType::Where) {
        parser.next_token();
        Some(parse_condition(parser)?)
    } else {
        None
    };

    let group_by = if parser.current_token_is(&TokenType::Group) {
        parser.next_token();
        parser.expect_token(TokenType::By)?;
        parse_column_list(parser)?
    } else {
        Vec::new()
    };

    let order_by = if parser.current_token_is(&TokenType::Order) {
        parser.next_token();
        parser.expect_token(TokenType::By)?;
        parse_order_by(parser)?
    } else {
        Vec::new()
    };

    // Trailing TOP n or LIMIT n; a second spelling is rejected with both
    // positions reported
    while parser.current_token_is(&TokenType::Top) || parser.current_token_is(&TokenType::Limit) {
        limit = Some(parse_limit_clause(parser, limit.take())?);
    }

    if parser.current_token_is(&TokenType::Semicolon) {
        parser.next_token();
    }

    if !parser.current_token_is(&TokenType::Eof) {
        // Unknown lexer tokens also land here, with their exact position
        let token = parser.current_token.clone().ok_or(ParseError::EndOfInput)?;
        return Err(ParseError::TrailingInput {
            literal: token.literal,
            line: token.line,
            column: token.column,
        });
    }

    let statement = SelectStatement {
        columns,
        wildcard,
        distinct,
        from,
        joins,
        where_clause,
        group_by,
        order_by,
        top: limit.map(|l| l.value),
    };

    check_group_by_invariant(&statement)?;
    resolve_qualifiers(parser, &statement)?;

    trace!(
        "parsed select on '{}': {} columns, {} joins",
        statement.from.name,
        statement.columns.len(),
        statement.joins.len()
    );

    Ok(statement)
}

/// Parse the select list: `*` or a comma-separated list of items
fn parse_select_list(parser: &mut Parser) -> ParseResult<(Vec<SelectItem>, bool)> {
    if parser.current_token_is(&TokenType::Star) {
        parser.next_token();
        return Ok((Vec::new(), true));
    }

    let mut items = vec![parse_select_item(parser)?];
    while parser.current_token_is(&TokenType::Comma) {
        parser.next_token();
        items.push(parse_select_item(parser)?);
    }

    Ok((items, false))
}

/// Parse one select-list item: column or aggregate call, optionally aliased
fn parse_select_item(parser: &mut Parser) -> ParseResult<SelectItem> {
    let expression = if current_is_aggregate(parser) {
        SelectExpression::Aggregate(parse_aggregate_call(parser)?)
    } else {
        SelectExpression::Column(parse_column_ref(parser)?)
    };

    let alias = parse_alias(parser)?;

    Ok(SelectItem { expression, alias })
}

fn current_is_aggregate(parser: &Parser) -> bool {
    parser.current_token_is(&TokenType::Count)
        || parser.current_token_is(&TokenType::Sum)
        || parser.current_token_is(&TokenType::Avg)
        || parser.current_token_is(&TokenType::Min)
        || parser.current_token_is(&TokenType::Max)
}

/// Parse `COUNT([DISTINCT] x | *)`, `SUM(x)`, `AVG(x)`, `MIN(x)`, `MAX(x)`
fn parse_aggregate_call(parser: &mut Parser) -> ParseResult<AggregateCall> {
    let function = match parser.current_token.as_ref().map(|t| &t.token_type) {
        Some(TokenType::Count) => AggregateFunction::Count,
        Some(TokenType::Sum) => AggregateFunction::Sum,
        Some(TokenType::Avg) => AggregateFunction::Avg,
        Some(TokenType::Min) => AggregateFunction::Min,
        Some(TokenType::Max) => AggregateFunction::Max,
        _ => return Err(parser.unexpected()),
    };
    parser.next_token();

    parser.expect_token(TokenType::LeftParen)?;

    let mut distinct = false;
    if parser.current_token_is(&TokenType::Distinct) {
        if function != AggregateFunction::Count {
            return Err(parser.unexpected());
        }
        parser.next_token();
        distinct = true;
    }

    let argument = if parser.current_token_is(&TokenType::Star) {
        if function != AggregateFunction::Count || distinct {
            return Err(parser.unexpected());
        }
        parser.next_token();
        None
    } else {
        Some(parse_column_ref(parser)?)
    };

    parser.expect_token(TokenType::RightParen)?;

    Ok(AggregateCall {
        function,
        argument,
        distinct,
    })
}

/// Parse an optional `AS alias` or bare-identifier alias
fn parse_alias(parser: &mut Parser) -> ParseResult<Option<String>> {
    if parser.current_token_is(&TokenType::As) {
        parser.next_token();
        let (alias, _, _) = parser.expect_identifier()?;
        return Ok(Some(alias));
    }

    if parser.current_token_is(&TokenType::Identifier(String::new())) {
        let (alias, _, _) = parser.expect_identifier()?;
        return Ok(Some(alias));
    }

    Ok(None)
}

/// Parse a column reference, optionally table-qualified
pub(crate) fn parse_column_ref(parser: &mut Parser) -> ParseResult<ColumnRef> {
    let (first, line, column) = parser.expect_identifier()?;

    if parser.current_token_is(&TokenType::Dot) {
        parser.next_token();
        let (name, _, _) = parser.expect_identifier()?;
        parser.qualified_refs.push((first.clone(), line, column));
        Ok(ColumnRef {
            table: Some(first),
            name,
        })
    } else {
        Ok(ColumnRef {
            table: None,
            name: first,
        })
    }
}

/// Parse a table reference with optional alias
fn parse_table_ref(parser: &mut Parser) -> ParseResult<TableRef> {
    let (name, _, _) = parser.expect_identifier()?;
    let alias = parse_alias(parser)?;
    Ok(TableRef { name, alias })
}

/// Parse `[INNER | LEFT [OUTER]] JOIN table [alias] ON left = right`
fn parse_join_clause(parser: &mut Parser) -> ParseResult<JoinClause> {
    let kind = if parser.current_token_is(&TokenType::Inner) {
        parser.next_token();
        JoinKind::Inner
    } else if parser.current_token_is(&TokenType::Left) {
        parser.next_token();
        if parser.current_token_is(&TokenType::Outer) {
            parser.next_token();
        }
        JoinKind::Left
    } else {
        JoinKind::Inner
    };

    parser.expect_token(TokenType::Join)?;
    let table = parse_table_ref(parser)?;

    parser.expect_token(TokenType::On)?;
    let left_column = parse_column_ref(parser)?;
    parser.expect_token(TokenType::Equals)?;
    let right_column = parse_column_ref(parser)?;

    Ok(JoinClause {
        kind,
        table,
        left_column,
        right_column,
    })
}

/// Parse a comma-separated column list (GROUP BY)
fn parse_column_list(parser: &mut Parser) -> ParseResult<Vec<ColumnRef>> {
    let mut columns = vec![parse_column_ref(parser)?];
    while parser.current_token_is(&TokenType::Comma) {
        parser.next_token();
        columns.push(parse_column_ref(parser)?);
    }
    Ok(columns)
}

/// Parse ORDER BY items with optional ASC/DESC per column
fn parse_order_by(parser: &mut Parser) -> ParseResult<Vec<OrderItem>> {
    let mut items = Vec::new();

    loop {
        let column = parse_column_ref(parser)?;
        let descending = if parser.current_token_is(&TokenType::Desc) {
            parser.next_token();
            true
        } else {
            if parser.current_token_is(&TokenType::Asc) {
                parser.next_token();
            }
            false
        };
        items.push(OrderItem { column, descending });

        if parser.current_token_is(&TokenType::Comma) {
            parser.next_token();
        } else {
            break;
        }
    }

    Ok(items)
}

/// Parse `TOP n` or `LIMIT n`; `previous` holds an already-seen limit
/// clause and triggers the duplicate diagnostic
fn parse_limit_clause(parser: &mut Parser, previous: Option<LimitSpec>) -> ParseResult<LimitSpec> {
    let keyword = parser.current_token.clone().ok_or(ParseError::EndOfInput)?;
    let clause = if keyword.token_type == TokenType::Top {
        "TOP"
    } else {
        "LIMIT"
    };
    parser.next_token();

    let value_token = parser.expect_token(TokenType::Integer(0))?;
    let value = match value_token.token_type {
        TokenType::Integer(n) if n > 0 && n <= u32::MAX as i64 => n as u32,
        _ => {
            return Err(ParseError::InvalidLimit {
                literal: value_token.literal,
                line: value_token.line,
                column: value_token.column,
            });
        }
    };

    if let Some(first) = previous {
        return Err(ParseError::DuplicateLimit {
            first_clause: first.clause.to_string(),
            first_line: first.line,
            first_column: first.column,
            second_clause: clause.to_string(),
            second_line: keyword.line,
            second_column: keyword.column,
        });
    }

    Ok(LimitSpec {
        value,
        clause,
        line: keyword.line,
        column: keyword.column,
    })
}

/// Aggregates mixed with plain columns require a GROUP BY; a select list
/// of aggregates only is allowed without one
fn check_group_by_invariant(statement: &SelectStatement) -> ParseResult<()> {
    let has_aggregate = statement
        .columns
        .iter()
        .any(|item| matches!(item.expression, SelectExpression::Aggregate(_)));
    let has_plain = statement.wildcard
        || statement
            .columns
            .iter()
            .any(|item| matches!(item.expression, SelectExpression::Column(_)));

    if has_aggregate && has_plain && statement.group_by.is_empty() {
        return Err(ParseError::MissingGroupBy);
    }

    Ok(())
}

/// Every table qualifier must name the FROM table, its alias, or a join
/// table/alias
fn resolve_qualifiers(parser: &Parser, statement: &SelectStatement) -> ParseResult<()> {
    let mut known: HashSet<&str> = HashSet::new();
    known.insert(statement.from.name.as_str());
    if let Some(alias) = &statement.from.alias {
        known.insert(alias.as_str());
    }
    for join in &statement.joins {
        known.insert(join.table.name.as_str());
        if let Some(alias) = &join.table.alias {
            known.insert(alias.as_str());
        }
    }

    for (qualifier, line, column) in &parser.qualified_refs {
        if !known.contains(qualifier.as_str()) {
            return Err(ParseError::UnknownQualifier {
                qualifier: qualifier.clone(),
                line: *line,
                column: *column,
            });
        }
    }

    Ok(())
}
