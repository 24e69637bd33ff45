// Query-XML to SQL Generator
//
// Deterministic textual rendering of the structural model. This is the
// one direction allowed to degrade: constructs with no SQL equivalent
// are rendered as the closest meaningful SQL and every approximation or
// omission is described in a warning, never dropped silently.

use std::fmt::Write as _;

use serde::Serialize;

use crate::xml::model::*;

/// Reverse-transpilation output: SQL text plus the warnings accumulated
/// while rendering it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranspiledSql {
    pub sql: String,
    pub warnings: Vec<String>,
    /// Virtual columns surfaced as result-mapping hints instead of
    /// select-list entries
    pub result_hints: Vec<String>,
}

/// Render a structural model as SQL
pub fn generate(model: &QueryXmlModel) -> TranspiledSql {
    let mut warnings = Vec::new();
    let mut sql = String::from("SELECT ");

    if model.distinct {
        sql.push_str("DISTINCT ");
    }

    // Column list: entity attributes first, then link attributes
    // qualified by each link's alias
    let mut columns = Vec::new();
    for attribute in &model.attributes {
        columns.push(render_attribute(attribute, None));
    }
    for (index, link) in model.links.iter().enumerate() {
        let alias = link_alias(link, index);
        for attribute in &link.attributes {
            columns.push(render_attribute(attribute, Some(&alias)));
        }
    }

    if columns.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&columns.join(", "));
    }

    let _ = write!(sql, " FROM {}", model.entity_name);

    for (index, link) in model.links.iter().enumerate() {
        let alias = link_alias(link, index);
        let join_keyword = match link.link_type {
            LinkType::Inner => "INNER JOIN",
            LinkType::Outer => "LEFT JOIN",
            other => {
                warnings.push(format!(
                    "link type '{}' on '{}' has no SQL equivalent; rendered as INNER JOIN",
                    other.token(),
                    link.name
                ));
                "INNER JOIN"
            }
        };
        let _ = write!(
            sql,
            " {} {} AS {} ON {}.{} = {}.{}",
            join_keyword,
            link.name,
            alias,
            alias,
            link.from_column,
            model.entity_name,
            link.to_column
        );
    }

    if let Some(filter) = &model.filter {
        if let Some(rendered) = render_filter(filter, &mut warnings) {
            let _ = write!(sql, " WHERE {}", rendered);
        } else {
            warnings.push("filter produced no renderable conditions; WHERE omitted".to_string());
        }
    }

    let mut grouped: Vec<String> = model
        .attributes
        .iter()
        .filter(|attr| attr.group_by)
        .map(|attr| attr.name.clone())
        .collect();
    for (index, link) in model.links.iter().enumerate() {
        let alias = link_alias(link, index);
        for attribute in link.attributes.iter().filter(|attr| attr.group_by) {
            grouped.push(format!("{}.{}", alias, attribute.name));
        }
    }
    if !grouped.is_empty() {
        let _ = write!(sql, " GROUP BY {}", grouped.join(", "));
    } else if model.aggregate {
        let has_plain = model.attributes.iter().any(|attr| attr.aggregate.is_none())
            || model
                .links
                .iter()
                .any(|link| link.attributes.iter().any(|attr| attr.aggregate.is_none()));
        if has_plain {
            warnings.push(
                "aggregate document mixes plain attributes without grouping keys; \
                 the SQL may be rejected by a stricter engine"
                    .to_string(),
            );
        }
    }

    if !model.orders.is_empty() {
        let rendered: Vec<String> = model
            .orders
            .iter()
            .map(|order| {
                if order.descending {
                    format!("{} DESC", order.attribute)
                } else {
                    order.attribute.clone()
                }
            })
            .collect();
        let _ = write!(sql, " ORDER BY {}", rendered.join(", "));
    }

    if let Some(top) = model.top {
        let _ = write!(sql, " LIMIT {}", top);
    }

    TranspiledSql {
        sql,
        warnings,
        result_hints: Vec::new(),
    }
}

/// Stable join alias: the link's own alias, or t1, t2, ... in link order
fn link_alias(link: &LinkEntity, index: usize) -> String {
    match &link.alias {
        Some(alias) => alias.clone(),
        None => format!("t{}", index + 1),
    }
}

/// Render one select-list entry
fn render_attribute(attribute: &AttributeSelection, qualifier: Option<&str>) -> String {
    let name = match qualifier {
        Some(q) if attribute.name != "*" => format!("{}.{}", q, attribute.name),
        _ => attribute.name.clone(),
    };

    let mut rendered = match attribute.aggregate.as_deref() {
        Some("count") if attribute.name == "*" => "COUNT(*)".to_string(),
        Some(function) if attribute.distinct => {
            format!("{}(DISTINCT {})", function.to_uppercase(), name)
        }
        Some(function) => format!("{}({})", function.to_uppercase(), name),
        None => name,
    };

    if let Some(alias) = &attribute.alias {
        let _ = write!(rendered, " AS {}", alias);
    }

    rendered
}

/// Render a filter node; None when nothing renderable remains
fn render_filter(node: &FilterNode, warnings: &mut Vec<String>) -> Option<String> {
    match node {
        FilterNode::Condition {
            attribute,
            operator,
            value,
            values,
        } => render_condition(attribute, *operator, value.as_deref(), values, warnings),
        FilterNode::Group { logical, children } => {
            let rendered: Vec<String> = children
                .iter()
                .filter_map(|child| {
                    render_filter(child, warnings).map(|text| match child {
                        // Nested groups keep their own grouping
                        FilterNode::Group { children, .. } if children.len() > 1 => {
                            format!("({})", text)
                        }
                        _ => text,
                    })
                })
                .collect();

            match rendered.len() {
                0 => None,
                1 => Some(rendered.into_iter().next().unwrap()),
                _ => {
                    let separator = match logical {
                        LogicalOp::And => " AND ",
                        LogicalOp::Or => " OR ",
                    };
                    Some(rendered.join(separator))
                }
            }
        }
    }
}

fn render_condition(
    attribute: &str,
    operator: XmlOperator,
    value: Option<&str>,
    values: &[String],
    warnings: &mut Vec<String>,
) -> Option<String> {
    match operator {
        XmlOperator::Null => Some(format!("{} IS NULL", attribute)),
        XmlOperator::NotNull => Some(format!("{} IS NOT NULL", attribute)),
        XmlOperator::In | XmlOperator::NotIn => {
            if values.is_empty() {
                warnings.push(format!(
                    "'{}' condition on '{}' has no values; condition omitted",
                    operator.token(),
                    attribute
                ));
                return None;
            }
            let list: Vec<String> = values.iter().map(|v| render_value(v)).collect();
            let keyword = if operator == XmlOperator::In {
                "IN"
            } else {
                "NOT IN"
            };
            Some(format!("{} {} ({})", attribute, keyword, list.join(", ")))
        }
        scalar => {
            let Some(value) = value else {
                warnings.push(format!(
                    "condition on '{}' with operator '{}' has no value; condition omitted",
                    attribute,
                    scalar.token()
                ));
                return None;
            };
            let sql_operator = match scalar {
                XmlOperator::Eq => "=",
                XmlOperator::Ne => "<>",
                XmlOperator::Lt => "<",
                XmlOperator::Gt => ">",
                XmlOperator::Le => "<=",
                XmlOperator::Ge => ">=",
                XmlOperator::Like => "LIKE",
                XmlOperator::NotLike => "NOT LIKE",
                _ => unreachable!("null and list operators handled above"),
            };
            Some(format!(
                "{} {} {}",
                attribute,
                sql_operator,
                render_value(value)
            ))
        }
    }
}

/// Numeric-looking values stay bare; everything else becomes a quoted
/// string literal with '' escaping
fn render_value(value: &str) -> String {
    if value.parse::<i64>().is_ok() || value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}
