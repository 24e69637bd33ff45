// Query-XML Structural Validator
//
// Checks a query-XML document against the subset the transpiler
// understands. Structural only; nothing is checked against live
// metadata. Every violation found is reported, not just the first, so
// the host can show the complete list at once.

use thiserror::Error;

use crate::xml::model::{LinkType, LogicalOp, XmlOperator};
use crate::xml::scan::{self, XmlElement};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0}")]
    Malformed(String),
    #[error("root element must be <query>, found <{found}>")]
    WrongRootElement { found: String },
    #[error("top value '{value}' is not a row count")]
    InvalidTopValue { value: String },
    #[error("attribute '{attribute}' on <{element}> must be \"true\" or \"false\", found '{value}'")]
    InvalidBoolValue {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("<query> must contain exactly one <entity> element")]
    MissingEntity,
    #[error("<entity> is missing a non-empty name attribute")]
    EntityMissingName,
    #[error("<attribute> is missing a non-empty name attribute")]
    AttributeMissingName,
    #[error("unknown aggregate function '{value}'")]
    UnknownAggregateFunction { value: String },
    #[error("attribute '{attribute}' uses an aggregate but the document is not marked aggregate=\"true\"")]
    AggregateOutsideAggregateQuery { attribute: String },
    #[error("<filter> type must be \"and\" or \"or\", found '{value}'")]
    InvalidFilterType { value: String },
    #[error("<filter> group must contain at least one condition or nested filter")]
    EmptyFilterGroup,
    #[error("<condition> is missing a non-empty attribute name")]
    ConditionMissingAttribute,
    #[error("unknown condition operator '{value}'")]
    UnknownOperator { value: String },
    #[error("condition on '{attribute}' with operator '{operator}' requires a value")]
    MissingConditionValue {
        attribute: String,
        operator: String,
    },
    #[error("<link> is missing a non-empty {attribute} attribute")]
    LinkMissingAttribute { attribute: String },
    #[error("link type '{value}' is not recognized")]
    InvalidLinkType { value: String },
    #[error("<order> is missing a non-empty attribute name")]
    OrderMissingAttribute,
    #[error("unexpected element <{element}> inside <{parent}>")]
    UnexpectedElement { parent: String, element: String },
}

/// Validate a query-XML document, returning every structural violation
pub fn validate(xml_text: &str) -> Result<(), Vec<ValidationError>> {
    let root = match scan::parse_document(xml_text) {
        Ok(root) => root,
        Err(err) => return Err(vec![ValidationError::Malformed(err.to_string())]),
    };

    let mut errors = Vec::new();
    validate_root(&root, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_root(root: &XmlElement, errors: &mut Vec<ValidationError>) {
    if root.name != "query" {
        errors.push(ValidationError::WrongRootElement {
            found: root.name.clone(),
        });
        return;
    }

    if let Some(top) = root.attr("top") {
        if top.parse::<u32>().is_err() {
            errors.push(ValidationError::InvalidTopValue {
                value: top.to_string(),
            });
        }
    }
    check_bool_attr(root, "distinct", errors);
    check_bool_attr(root, "aggregate", errors);

    let aggregate_query = root.attr("aggregate") == Some("true");

    let entities: Vec<_> = root.children_named("entity").collect();
    if entities.len() != 1 {
        errors.push(ValidationError::MissingEntity);
    }
    for child in &root.children {
        if child.name != "entity" {
            errors.push(ValidationError::UnexpectedElement {
                parent: "query".to_string(),
                element: child.name.clone(),
            });
        }
    }

    for entity in entities {
        validate_entity(entity, aggregate_query, errors);
    }
}

fn validate_entity(entity: &XmlElement, aggregate_query: bool, errors: &mut Vec<ValidationError>) {
    if entity.attr("name").unwrap_or("").is_empty() {
        errors.push(ValidationError::EntityMissingName);
    }

    for child in &entity.children {
        match child.name.as_str() {
            "attribute" => validate_attribute(child, aggregate_query, errors),
            "filter" => validate_filter(child, errors),
            "link" => validate_link(child, aggregate_query, errors),
            "order" => {
                if child.attr("attribute").unwrap_or("").is_empty() {
                    errors.push(ValidationError::OrderMissingAttribute);
                }
            }
            other => errors.push(ValidationError::UnexpectedElement {
                parent: "entity".to_string(),
                element: other.to_string(),
            }),
        }
    }
}

fn validate_attribute(
    attribute: &XmlElement,
    aggregate_query: bool,
    errors: &mut Vec<ValidationError>,
) {
    let name = attribute.attr("name").unwrap_or("");
    if name.is_empty() {
        errors.push(ValidationError::AttributeMissingName);
    }

    if let Some(function) = attribute.attr("aggregate") {
        if !matches!(function, "count" | "sum" | "avg" | "min" | "max") {
            errors.push(ValidationError::UnknownAggregateFunction {
                value: function.to_string(),
            });
        }
        if !aggregate_query {
            errors.push(ValidationError::AggregateOutsideAggregateQuery {
                attribute: name.to_string(),
            });
        }
    }
    check_bool_attr(attribute, "distinct", errors);
    check_bool_attr(attribute, "groupby", errors);
}

fn validate_filter(filter: &XmlElement, errors: &mut Vec<ValidationError>) {
    let filter_type = filter.attr("type").unwrap_or("and");
    if LogicalOp::from_token(filter_type).is_none() {
        errors.push(ValidationError::InvalidFilterType {
            value: filter_type.to_string(),
        });
    }

    let mut children = 0usize;
    for child in &filter.children {
        match child.name.as_str() {
            "condition" => {
                children += 1;
                validate_condition(child, errors);
            }
            "filter" => {
                children += 1;
                validate_filter(child, errors);
            }
            other => errors.push(ValidationError::UnexpectedElement {
                parent: "filter".to_string(),
                element: other.to_string(),
            }),
        }
    }

    if children == 0 {
        errors.push(ValidationError::EmptyFilterGroup);
    }
}

fn validate_condition(condition: &XmlElement, errors: &mut Vec<ValidationError>) {
    let attribute = condition.attr("attribute").unwrap_or("");
    if attribute.is_empty() {
        errors.push(ValidationError::ConditionMissingAttribute);
    }

    let operator_token = condition.attr("operator").unwrap_or("");
    let Some(operator) = XmlOperator::from_token(operator_token) else {
        errors.push(ValidationError::UnknownOperator {
            value: operator_token.to_string(),
        });
        return;
    };

    // Null tests carry no value; list operators carry <value> children;
    // everything else needs a value attribute
    match operator {
        XmlOperator::Null | XmlOperator::NotNull => {}
        XmlOperator::In | XmlOperator::NotIn => {
            if condition.children_named("value").next().is_none() {
                errors.push(ValidationError::MissingConditionValue {
                    attribute: attribute.to_string(),
                    operator: operator.token().to_string(),
                });
            }
        }
        _ => {
            if condition.attr("value").is_none() {
                errors.push(ValidationError::MissingConditionValue {
                    attribute: attribute.to_string(),
                    operator: operator.token().to_string(),
                });
            }
        }
    }
}

fn validate_link(link: &XmlElement, aggregate_query: bool, errors: &mut Vec<ValidationError>) {
    for required in ["name", "from", "to"] {
        if link.attr(required).unwrap_or("").is_empty() {
            errors.push(ValidationError::LinkMissingAttribute {
                attribute: required.to_string(),
            });
        }
    }

    if let Some(link_type) = link.attr("type") {
        if LinkType::from_token(link_type).is_none() {
            errors.push(ValidationError::InvalidLinkType {
                value: link_type.to_string(),
            });
        }
    }

    for child in &link.children {
        match child.name.as_str() {
            "attribute" => validate_attribute(child, aggregate_query, errors),
            other => errors.push(ValidationError::UnexpectedElement {
                parent: "link".to_string(),
                element: other.to_string(),
            }),
        }
    }
}

fn check_bool_attr(element: &XmlElement, attribute: &str, errors: &mut Vec<ValidationError>) {
    if let Some(value) = element.attr(attribute) {
        if value != "true" && value != "false" {
            errors.push(ValidationError::InvalidBoolValue {
                element: element.name.clone(),
                attribute: attribute.to_string(),
                value: value.to_string(),
            });
        }
    }
}
