// Query-XML Reader
//
// Extracts the structural model from a query-XML document. Built on the
// element-tree scanner, so nested filter groups keep their exact shape.
// Input normally passed the validator first; documents that did not are
// still rejected with a typed ReadError rather than a panic.

use thiserror::Error;

use crate::xml::model::*;
use crate::xml::scan::{self, XmlElement, XmlScanError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error(transparent)]
    Malformed(#[from] XmlScanError),
    #[error("expected a <query> document, found <{found}>")]
    NotAQuery { found: String },
    #[error("<query> has no <entity> element")]
    MissingEntity,
    #[error("<entity> has no name")]
    MissingEntityName,
    #[error("top value '{value}' is not a row count")]
    InvalidTop { value: String },
    #[error("<{element}> has no attribute name")]
    MissingAttributeName { element: String },
    #[error("unknown aggregate function '{value}'")]
    UnknownAggregate { value: String },
    #[error("unknown condition operator '{value}'")]
    UnknownOperator { value: String },
    #[error("unknown filter type '{value}'")]
    UnknownFilterType { value: String },
    #[error("unknown link type '{value}'")]
    UnknownLinkType { value: String },
    #[error("<link> is missing its {attribute} attribute")]
    IncompleteLink { attribute: String },
}

pub type ReadResult<T> = Result<T, ReadError>;

/// Read a query-XML document into its structural model
pub fn read(xml_text: &str) -> ReadResult<QueryXmlModel> {
    let root = scan::parse_document(xml_text)?;

    if root.name != "query" {
        return Err(ReadError::NotAQuery {
            found: root.name.clone(),
        });
    }

    let top = match root.attr("top") {
        Some(value) => Some(value.parse::<u32>().map_err(|_| ReadError::InvalidTop {
            value: value.to_string(),
        })?),
        None => None,
    };

    let entity = root
        .first_child("entity")
        .ok_or(ReadError::MissingEntity)?;
    let entity_name = entity
        .attr("name")
        .filter(|name| !name.is_empty())
        .ok_or(ReadError::MissingEntityName)?
        .to_string();

    let mut attributes = Vec::new();
    for element in entity.children_named("attribute") {
        attributes.push(read_attribute(element)?);
    }

    let filter = match entity.first_child("filter") {
        Some(element) => Some(read_filter(element)?),
        None => None,
    };

    let mut links = Vec::new();
    for element in entity.children_named("link") {
        links.push(read_link(element)?);
    }

    let mut orders = Vec::new();
    for element in entity.children_named("order") {
        let attribute = element
            .attr("attribute")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ReadError::MissingAttributeName {
                element: "order".to_string(),
            })?;
        orders.push(OrderSpec {
            attribute: attribute.to_string(),
            descending: element.attr("descending") == Some("true"),
        });
    }

    let aggregate = root.attr("aggregate") == Some("true")
        || attributes.iter().any(|attr| attr.aggregate.is_some())
        || links
            .iter()
            .any(|link| link.attributes.iter().any(|attr| attr.aggregate.is_some()));

    Ok(QueryXmlModel {
        entity_name,
        attributes,
        filter,
        links,
        orders,
        distinct: root.attr("distinct") == Some("true"),
        aggregate,
        top,
    })
}

fn read_attribute(element: &XmlElement) -> ReadResult<AttributeSelection> {
    let name = element
        .attr("name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ReadError::MissingAttributeName {
            element: "attribute".to_string(),
        })?;

    let aggregate = match element.attr("aggregate") {
        Some(function) => {
            if !matches!(function, "count" | "sum" | "avg" | "min" | "max") {
                return Err(ReadError::UnknownAggregate {
                    value: function.to_string(),
                });
            }
            Some(function.to_string())
        }
        None => None,
    };

    Ok(AttributeSelection {
        name: name.to_string(),
        alias: element.attr("alias").map(str::to_string),
        aggregate,
        group_by: element.attr("groupby") == Some("true"),
        distinct: element.attr("distinct") == Some("true"),
    })
}

/// Read a filter group; children recurse, preserving nesting exactly
fn read_filter(element: &XmlElement) -> ReadResult<FilterNode> {
    let type_token = element.attr("type").unwrap_or("and");
    let logical = LogicalOp::from_token(type_token).ok_or_else(|| ReadError::UnknownFilterType {
        value: type_token.to_string(),
    })?;

    let mut children = Vec::new();
    for child in &element.children {
        match child.name.as_str() {
            "condition" => children.push(read_condition(child)?),
            "filter" => children.push(read_filter(child)?),
            _ => {}
        }
    }

    Ok(FilterNode::Group { logical, children })
}

fn read_condition(element: &XmlElement) -> ReadResult<FilterNode> {
    let attribute = element
        .attr("attribute")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ReadError::MissingAttributeName {
            element: "condition".to_string(),
        })?;

    let operator_token = element.attr("operator").unwrap_or("");
    let operator =
        XmlOperator::from_token(operator_token).ok_or_else(|| ReadError::UnknownOperator {
            value: operator_token.to_string(),
        })?;

    let values: Vec<String> = element
        .children_named("value")
        .map(|value| value.text.trim().to_string())
        .collect();

    Ok(FilterNode::Condition {
        attribute: attribute.to_string(),
        operator,
        value: element.attr("value").map(str::to_string),
        values,
    })
}

fn read_link(element: &XmlElement) -> ReadResult<LinkEntity> {
    let required = |attribute: &str| -> ReadResult<String> {
        element
            .attr(attribute)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ReadError::IncompleteLink {
                attribute: attribute.to_string(),
            })
    };

    let link_type = match element.attr("type") {
        Some(token) => LinkType::from_token(token).ok_or_else(|| ReadError::UnknownLinkType {
            value: token.to_string(),
        })?,
        None => LinkType::Inner,
    };

    let mut attributes = Vec::new();
    for child in element.children_named("attribute") {
        attributes.push(read_attribute(child)?);
    }

    Ok(LinkEntity {
        name: required("name")?,
        from_column: required("from")?,
        to_column: required("to")?,
        link_type,
        alias: element.attr("alias").map(str::to_string),
        attributes,
    })
}
