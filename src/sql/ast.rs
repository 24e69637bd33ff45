// SQL Abstract Syntax Tree (AST) Implementation
//
// This module defines the AST for the SELECT dialect the transpiler
// accepts. Every expression kind is a closed enum so the generators'
// matches are exhaustively checked.

use std::fmt;

/// SELECT statement representation, the root of the AST
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Items in the SELECT clause; empty only when `wildcard` is set
    pub columns: Vec<SelectItem>,
    /// `SELECT *`
    pub wildcard: bool,
    /// `SELECT DISTINCT`
    pub distinct: bool,
    /// FROM clause table reference
    pub from: TableRef,
    /// JOIN clauses in declaration order
    pub joins: Vec<JoinClause>,
    /// WHERE clause condition tree (optional)
    pub where_clause: Option<Condition>,
    /// GROUP BY columns in declaration order
    pub group_by: Vec<ColumnRef>,
    /// ORDER BY items in declaration order
    pub order_by: Vec<OrderItem>,
    /// Row limit from TOP n or LIMIT n
    pub top: Option<u32>,
}

/// One entry of the SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expression: SelectExpression,
    pub alias: Option<String>,
}

/// What a SELECT list entry selects
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpression {
    Column(ColumnRef),
    Aggregate(AggregateCall),
}

/// Column reference, optionally qualified with a table name or alias
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnRef {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnRef {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Aggregate function call in a SELECT list
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    /// None encodes COUNT(*)
    pub argument: Option<ColumnRef>,
    /// COUNT(DISTINCT x)
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Lowercase name used both in SQL output and query-XML attributes
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

/// Table reference in FROM or JOIN
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// Join clause: `[INNER|LEFT [OUTER]] JOIN table ON left = right`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: TableRef,
    pub left_column: ColumnRef,
    pub right_column: ColumnRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// Boolean condition tree for the WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        column: ColumnRef,
        operator: ComparisonOperator,
        value: Value,
    },
    /// `x IN (v1, v2, ...)`
    InList {
        column: ColumnRef,
        values: Vec<Value>,
    },
    /// `x IS NULL` / `x IS NOT NULL`
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessEquals,
    GreaterEquals,
    Like,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ComparisonOperator::Equals => "=",
            ComparisonOperator::NotEquals => "<>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessEquals => "<=",
            ComparisonOperator::GreaterEquals => ">=",
            ComparisonOperator::Like => "LIKE",
        };
        write!(f, "{}", text)
    }
}

/// Literal values in conditions
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Plain text form, as it appears in a query-XML value attribute
    pub fn as_text(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub column: ColumnRef,
    pub descending: bool,
}
