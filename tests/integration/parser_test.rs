use anyhow::{anyhow, Result};
use queryxml::sql::ast::*;
use queryxml::sql::parser::{ParseError, Parser};

#[test]
fn test_simple_select_query() -> Result<()> {
    let sql = "SELECT name, revenue FROM account WHERE revenue > 1000000 ORDER BY revenue DESC";
    let statement = Parser::new(sql)
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    assert_eq!(statement.columns.len(), 2);
    assert_eq!(statement.from.name, "account");
    assert!(statement.where_clause.is_some(), "Expected WHERE clause");

    if let Some(Condition::Comparison {
        column,
        operator,
        value,
    }) = statement.where_clause
    {
        assert_eq!(column.name, "revenue");
        assert_eq!(operator, ComparisonOperator::GreaterThan);
        assert_eq!(value, Value::Integer(1_000_000));
    } else {
        panic!("Expected a comparison in the WHERE clause");
    }

    assert_eq!(statement.order_by.len(), 1);
    assert!(statement.order_by[0].descending);

    Ok(())
}

#[test]
fn test_distinct_and_wildcard() -> Result<()> {
    let statement = Parser::new("SELECT DISTINCT * FROM contact")
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    assert!(statement.distinct);
    assert!(statement.wildcard);
    assert!(statement.columns.is_empty());

    Ok(())
}

#[test]
fn test_joins_with_aliases() -> Result<()> {
    let sql = "SELECT a.name, c.fullname FROM account a \
               INNER JOIN contact c ON a.primarycontactid = c.contactid";
    let statement = Parser::new(sql)
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    assert_eq!(statement.from.alias.as_deref(), Some("a"));
    assert_eq!(statement.joins.len(), 1);

    let join = &statement.joins[0];
    assert_eq!(join.kind, JoinKind::Inner);
    assert_eq!(join.table.name, "contact");
    assert_eq!(join.table.alias.as_deref(), Some("c"));
    assert_eq!(join.left_column, ColumnRef::qualified("a", "primarycontactid"));
    assert_eq!(join.right_column, ColumnRef::qualified("c", "contactid"));

    Ok(())
}

#[test]
fn test_left_outer_join() -> Result<()> {
    let sql = "SELECT name FROM account LEFT OUTER JOIN contact ON account.primarycontactid = contact.contactid";
    let statement = Parser::new(sql)
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    assert_eq!(statement.joins[0].kind, JoinKind::Left);

    Ok(())
}

#[test]
fn test_aggregates_and_group_by() -> Result<()> {
    let sql = "SELECT statecode, COUNT(*) AS cnt FROM contact GROUP BY statecode";
    let statement = Parser::new(sql)
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    assert_eq!(statement.group_by, vec![ColumnRef::new("statecode")]);

    match &statement.columns[1].expression {
        SelectExpression::Aggregate(call) => {
            assert_eq!(call.function, AggregateFunction::Count);
            assert!(call.argument.is_none());
            assert!(!call.distinct);
        }
        other => panic!("expected an aggregate, got {:?}", other),
    }
    assert_eq!(statement.columns[1].alias.as_deref(), Some("cnt"));

    Ok(())
}

#[test]
fn test_count_distinct() -> Result<()> {
    let statement = Parser::new("SELECT COUNT(DISTINCT city) FROM account")
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    match &statement.columns[0].expression {
        SelectExpression::Aggregate(call) => {
            assert!(call.distinct);
            assert_eq!(call.argument.as_ref().unwrap().name, "city");
        }
        other => panic!("expected an aggregate, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_aggregate_without_group_by_requires_bare_aggregates() {
    let result = Parser::new("SELECT name, COUNT(*) FROM contact").parse_select();
    assert_eq!(result.unwrap_err(), ParseError::MissingGroupBy);

    // Aggregates-only select lists do not need GROUP BY
    assert!(Parser::new("SELECT COUNT(*) FROM contact")
        .parse_select()
        .is_ok());
}

#[test]
fn test_top_and_limit_spellings() -> Result<()> {
    let with_top = Parser::new("SELECT TOP 10 name FROM account")
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(with_top.top, Some(10));

    let with_limit = Parser::new("SELECT name FROM account LIMIT 5")
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(with_limit.top, Some(5));

    Ok(())
}

#[test]
fn test_duplicate_limit_names_both_clauses_and_positions() {
    let result = Parser::new("SELECT * FROM account TOP 10 LIMIT 5").parse_select();

    match result.unwrap_err() {
        ParseError::DuplicateLimit {
            first_clause,
            first_column,
            second_clause,
            second_column,
            ..
        } => {
            assert_eq!(first_clause, "TOP");
            assert_eq!(first_column, 23);
            assert_eq!(second_clause, "LIMIT");
            assert_eq!(second_column, 30);
        }
        other => panic!("expected DuplicateLimit, got {:?}", other),
    }
}

#[test]
fn test_zero_limit_is_rejected() {
    let result = Parser::new("SELECT name FROM account LIMIT 0").parse_select();
    assert!(matches!(result, Err(ParseError::InvalidLimit { .. })));
}

#[test]
fn test_unknown_qualifier_fails_at_parse_time() {
    let result = Parser::new("SELECT x.name FROM account a").parse_select();

    match result.unwrap_err() {
        ParseError::UnknownQualifier {
            qualifier,
            line,
            column,
        } => {
            assert_eq!(qualifier, "x");
            assert_eq!((line, column), (1, 8));
        }
        other => panic!("expected UnknownQualifier, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_carries_position() {
    let result = Parser::new("SELECT name FRM account").parse_select();

    let err = result.unwrap_err();
    let (line, column) = err.position().expect("position expected");
    assert_eq!(line, 1);
    // "FRM" is lexed as a bare alias, so the parser trips on "account"
    assert!(column > 1);
}

#[test]
fn test_in_and_null_predicates() -> Result<()> {
    let sql = "SELECT name FROM account \
               WHERE statecode IN (0, 1) AND parentid IS NOT NULL AND city LIKE 'Sea%'";
    let statement = Parser::new(sql)
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;

    // Left-associative AND chain: ((IN AND IS NOT NULL) AND LIKE)
    match statement.where_clause.unwrap() {
        Condition::And(left, right) => {
            assert!(matches!(
                *right,
                Condition::Comparison {
                    operator: ComparisonOperator::Like,
                    ..
                }
            ));
            match *left {
                Condition::And(inner_left, inner_right) => {
                    assert!(matches!(*inner_left, Condition::InList { .. }));
                    assert!(matches!(
                        *inner_right,
                        Condition::IsNull { negated: true, .. }
                    ));
                }
                other => panic!("expected nested AND, got {:?}", other),
            }
        }
        other => panic!("expected AND at the root, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_trailing_semicolon_is_tolerated() -> Result<()> {
    let statement = Parser::new("SELECT name FROM account;")
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    assert_eq!(statement.from.name, "account");

    Ok(())
}

#[test]
fn test_trailing_input_is_rejected() {
    let result = Parser::new("SELECT name FROM account HAVING name = 'x'").parse_select();
    assert!(matches!(result, Err(ParseError::TrailingInput { .. })));
}
