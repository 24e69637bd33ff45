// Query-XML Structural Model
//
// Simplified model of a query-XML document, produced by the reader and
// consumed by the SQL generator. Serde derives let the IDE host carry the
// model across its extension boundary as JSON.

use serde::{Deserialize, Serialize};

/// Structural model of one query-XML document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryXmlModel {
    pub entity_name: String,
    pub attributes: Vec<AttributeSelection>,
    pub filter: Option<FilterNode>,
    pub links: Vec<LinkEntity>,
    pub orders: Vec<OrderSpec>,
    pub distinct: bool,
    pub aggregate: bool,
    pub top: Option<u32>,
}

impl QueryXmlModel {
    /// Names of the attributes marked as grouping keys
    pub fn grouped_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|attr| attr.group_by)
            .map(|attr| attr.name.as_str())
            .collect()
    }
}

/// One attribute-selection element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSelection {
    pub name: String,
    pub alias: Option<String>,
    /// Aggregate function token (count, sum, avg, min, max)
    pub aggregate: Option<String>,
    pub group_by: bool,
    /// COUNT(DISTINCT x)
    pub distinct: bool,
}

impl AttributeSelection {
    pub fn plain(name: impl Into<String>) -> Self {
        AttributeSelection {
            name: name.into(),
            alias: None,
            aggregate: None,
            group_by: false,
            distinct: false,
        }
    }
}

/// Filter tree: a condition leaf or a logical group of children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Condition {
        attribute: String,
        operator: XmlOperator,
        /// Single literal for scalar operators; None for null tests
        value: Option<String>,
        /// Literals of an `in` condition
        values: Vec<String>,
    },
    Group {
        logical: LogicalOp,
        children: Vec<FilterNode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn token(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "and" => Some(LogicalOp::And),
            "or" => Some(LogicalOp::Or),
            _ => None,
        }
    }
}

/// Condition operator tokens of the query-XML dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XmlOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
    NotLike,
    In,
    NotIn,
    Null,
    NotNull,
}

impl XmlOperator {
    pub fn token(&self) -> &'static str {
        match self {
            XmlOperator::Eq => "eq",
            XmlOperator::Ne => "ne",
            XmlOperator::Lt => "lt",
            XmlOperator::Gt => "gt",
            XmlOperator::Le => "le",
            XmlOperator::Ge => "ge",
            XmlOperator::Like => "like",
            XmlOperator::NotLike => "not-like",
            XmlOperator::In => "in",
            XmlOperator::NotIn => "not-in",
            XmlOperator::Null => "null",
            XmlOperator::NotNull => "not-null",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(XmlOperator::Eq),
            "ne" => Some(XmlOperator::Ne),
            "lt" => Some(XmlOperator::Lt),
            "gt" => Some(XmlOperator::Gt),
            "le" => Some(XmlOperator::Le),
            "ge" => Some(XmlOperator::Ge),
            "like" => Some(XmlOperator::Like),
            "not-like" => Some(XmlOperator::NotLike),
            "in" => Some(XmlOperator::In),
            "not-in" => Some(XmlOperator::NotIn),
            "null" => Some(XmlOperator::Null),
            "not-null" => Some(XmlOperator::NotNull),
            _ => None,
        }
    }

    /// Operators that carry no literal value
    pub fn is_null_test(&self) -> bool {
        matches!(self, XmlOperator::Null | XmlOperator::NotNull)
    }
}

/// Link element: query-XML's representation of a join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntity {
    pub name: String,
    /// Column on the linked entity
    pub from_column: String,
    /// Column on the parent entity
    pub to_column: String,
    pub link_type: LinkType,
    pub alias: Option<String>,
    /// Attributes selected from the linked entity
    pub attributes: Vec<AttributeSelection>,
}

/// Recognized link-type tokens. Only `inner` and `outer` have an exact
/// SQL join; the rest degrade with a warning in the SQL generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Inner,
    Outer,
    Any,
    Exists,
}

impl LinkType {
    pub fn token(&self) -> &'static str {
        match self {
            LinkType::Inner => "inner",
            LinkType::Outer => "outer",
            LinkType::Any => "any",
            LinkType::Exists => "exists",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "inner" => Some(LinkType::Inner),
            "outer" => Some(LinkType::Outer),
            "any" => Some(LinkType::Any),
            "exists" => Some(LinkType::Exists),
            _ => None,
        }
    }
}

/// Order element: attribute plus direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub attribute: String,
    pub descending: bool,
}
