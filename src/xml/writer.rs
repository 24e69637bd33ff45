// SQL to Query-XML Generator
//
// Depth-first walk over the SelectStatement AST, emitting a query-XML
// document string. There is no best-effort mode in this direction: a
// construct without an exact query-XML rendering fails generation, so
// executed queries never silently diverge from what the user wrote.

use std::fmt::Write as _;

use log::debug;
use thiserror::Error;

use crate::metadata::MetadataLookup;
use crate::sql::ast::*;
use crate::xml::model::{LinkType, XmlOperator};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String },
    #[error("virtual column '{column}' cannot appear in a select list; it only exists in result payloads")]
    VirtualColumnSelected { column: String },
    #[error("cannot expand '*': no attribute metadata available for entity '{entity}'")]
    WildcardExpansionUnavailable { entity: String },
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Where a column reference lands in the document
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Entity,
    Link(usize),
}

/// Attribute element staged for emission
#[derive(Debug, Clone)]
struct StagedAttribute {
    name: String,
    alias: Option<String>,
    aggregate: Option<&'static str>,
    group_by: bool,
    distinct: bool,
}

/// Generate a query-XML document for a parsed SELECT statement
pub fn generate(
    statement: &SelectStatement,
    lookup: &dyn MetadataLookup,
) -> GenerationResult<String> {
    let aggregate = statement
        .columns
        .iter()
        .any(|item| matches!(item.expression, SelectExpression::Aggregate(_)))
        || !statement.group_by.is_empty();

    let mut entity_attributes: Vec<StagedAttribute> = Vec::new();
    let mut link_attributes: Vec<Vec<StagedAttribute>> = vec![Vec::new(); statement.joins.len()];

    if statement.wildcard {
        let expanded: Vec<String> = lookup
            .list_attributes(&statement.from.name)
            .into_iter()
            .filter(|name| !lookup.is_virtual_column(name))
            .collect();
        if expanded.is_empty() {
            return Err(GenerationError::WildcardExpansionUnavailable {
                entity: statement.from.name.clone(),
            });
        }
        for name in expanded {
            entity_attributes.push(StagedAttribute {
                name,
                alias: None,
                aggregate: None,
                group_by: false,
                distinct: false,
            });
        }
    }

    for item in &statement.columns {
        let staged = stage_select_item(statement, item, lookup)?;
        match staged.0 {
            Target::Entity => entity_attributes.push(staged.1),
            Target::Link(index) => link_attributes[index].push(staged.1),
        }
    }

    for column in &statement.group_by {
        let target = classify(statement, column.table.as_deref())?;
        let attributes = match target {
            Target::Entity => &mut entity_attributes,
            Target::Link(index) => &mut link_attributes[index],
        };
        match attributes
            .iter_mut()
            .find(|attr| attr.name == column.name && attr.aggregate.is_none())
        {
            Some(attr) => attr.group_by = true,
            None => attributes.push(StagedAttribute {
                name: column.name.clone(),
                alias: None,
                aggregate: None,
                group_by: true,
                distinct: false,
            }),
        }
    }

    let mut xml = String::new();

    // Root element
    xml.push_str("<query");
    if statement.distinct {
        xml.push_str(" distinct=\"true\"");
    }
    if aggregate {
        xml.push_str(" aggregate=\"true\"");
    }
    if let Some(top) = statement.top {
        let _ = write!(xml, " top=\"{}\"", top);
    }
    xml.push_str(">\n");

    let _ = writeln!(
        xml,
        "  <entity name=\"{}\">",
        escape_attr(&statement.from.name)
    );

    for attr in &entity_attributes {
        write_attribute_element(&mut xml, attr, 4);
    }

    if let Some(condition) = &statement.where_clause {
        write_filter(&mut xml, statement, condition, false, 4)?;
    }

    for (index, join) in statement.joins.iter().enumerate() {
        write_link(&mut xml, statement, join, &link_attributes[index])?;
    }

    for order in &statement.order_by {
        let target = classify(statement, order.column.table.as_deref())?;
        if target != Target::Entity {
            return Err(GenerationError::UnsupportedConstruct {
                construct: format!(
                    "ORDER BY on joined table column '{}'",
                    order.column
                ),
            });
        }
        xml.push_str("    <order attribute=\"");
        xml.push_str(&escape_attr(&order.column.name));
        xml.push('"');
        if order.descending {
            xml.push_str(" descending=\"true\"");
        }
        xml.push_str("/>\n");
    }

    xml.push_str("  </entity>\n");
    xml.push_str("</query>\n");

    debug!(
        "generated query-XML for entity '{}' ({} bytes)",
        statement.from.name,
        xml.len()
    );

    Ok(xml)
}

/// Stage one select-list item as an attribute element
fn stage_select_item(
    statement: &SelectStatement,
    item: &SelectItem,
    lookup: &dyn MetadataLookup,
) -> GenerationResult<(Target, StagedAttribute)> {
    match &item.expression {
        SelectExpression::Column(column) => {
            if lookup.is_virtual_column(&column.name) {
                return Err(GenerationError::VirtualColumnSelected {
                    column: column.name.clone(),
                });
            }
            let target = classify(statement, column.table.as_deref())?;
            Ok((
                target,
                StagedAttribute {
                    name: column.name.clone(),
                    alias: item.alias.clone(),
                    aggregate: None,
                    group_by: false,
                    distinct: false,
                },
            ))
        }
        SelectExpression::Aggregate(call) => {
            let (target, name) = match &call.argument {
                Some(column) => (
                    classify(statement, column.table.as_deref())?,
                    column.name.clone(),
                ),
                None => (Target::Entity, "*".to_string()),
            };
            let alias = item.alias.clone().unwrap_or_else(|| match &call.argument {
                Some(column) => format!("{}_{}", column.name, call.function.name()),
                None => "row_count".to_string(),
            });
            Ok((
                target,
                StagedAttribute {
                    name,
                    alias: Some(alias),
                    aggregate: Some(call.function.name()),
                    group_by: false,
                    distinct: call.distinct,
                },
            ))
        }
    }
}

/// Resolve a qualifier to the entity or one of the links. Unqualified
/// references belong to the entity.
fn classify(statement: &SelectStatement, qualifier: Option<&str>) -> GenerationResult<Target> {
    let Some(qualifier) = qualifier else {
        return Ok(Target::Entity);
    };

    if qualifier == statement.from.name || statement.from.alias.as_deref() == Some(qualifier) {
        return Ok(Target::Entity);
    }

    for (index, join) in statement.joins.iter().enumerate() {
        if qualifier == join.table.name || join.table.alias.as_deref() == Some(qualifier) {
            return Ok(Target::Link(index));
        }
    }

    // The parser already resolved qualifiers, so this is unreachable for
    // parsed statements, but hand-built ASTs still get a clean error.
    Err(GenerationError::UnsupportedConstruct {
        construct: format!("unresolved table qualifier '{}'", qualifier),
    })
}

fn write_attribute_element(xml: &mut String, attr: &StagedAttribute, indent: usize) {
    let _ = write!(
        xml,
        "{:indent$}<attribute name=\"{}\"",
        "",
        escape_attr(&attr.name),
        indent = indent
    );
    if let Some(function) = attr.aggregate {
        let _ = write!(xml, " aggregate=\"{}\"", function);
    }
    if let Some(alias) = &attr.alias {
        let _ = write!(xml, " alias=\"{}\"", escape_attr(alias));
    }
    if attr.distinct {
        xml.push_str(" distinct=\"true\"");
    }
    if attr.group_by {
        xml.push_str(" groupby=\"true\"");
    }
    xml.push_str("/>\n");
}

/// Emit a condition tree as nested filter elements. NOT nodes are lowered
/// exactly: comparisons invert their operator and groups distribute the
/// negation over flipped logical operators, so the document always mirrors
/// the AST's meaning.
fn write_filter(
    xml: &mut String,
    statement: &SelectStatement,
    condition: &Condition,
    negated: bool,
    indent: usize,
) -> GenerationResult<()> {
    match condition {
        Condition::And(_, _) | Condition::Or(_, _) => {
            let op_token = filter_op_token(condition, negated);
            let _ = writeln!(
                xml,
                "{:indent$}<filter type=\"{}\">",
                "",
                op_token,
                indent = indent
            );
            write_group_children(xml, statement, condition, negated, indent + 2)?;
            let _ = writeln!(xml, "{:indent$}</filter>", "", indent = indent);
            Ok(())
        }
        Condition::Not(inner) => write_filter(xml, statement, inner, !negated, indent),
        leaf => {
            // A lone predicate still gets a single-condition group
            let _ = writeln!(xml, "{:indent$}<filter type=\"and\">", "", indent = indent);
            write_condition(xml, statement, leaf, negated, indent + 2)?;
            let _ = writeln!(xml, "{:indent$}</filter>", "", indent = indent);
            Ok(())
        }
    }
}

/// Logical operator token for a group node, after negation
fn filter_op_token(condition: &Condition, negated: bool) -> &'static str {
    let is_and = matches!(condition, Condition::And(_, _));
    if is_and != negated { "and" } else { "or" }
}

/// Emit the children of an And/Or node, flattening same-operator chains
/// into one group so `a AND b AND c` becomes three siblings
fn write_group_children(
    xml: &mut String,
    statement: &SelectStatement,
    condition: &Condition,
    negated: bool,
    indent: usize,
) -> GenerationResult<()> {
    let own_op = std::mem::discriminant(condition);

    let (left, right) = match condition {
        Condition::And(left, right) | Condition::Or(left, right) => (left, right),
        _ => unreachable!("group children requested for a leaf"),
    };

    for child in [left.as_ref(), right.as_ref()] {
        // Peel NOT wrappers so chains negate correctly
        let mut child = child;
        let mut child_negated = negated;
        while let Condition::Not(inner) = child {
            child_negated = !child_negated;
            child = inner.as_ref();
        }

        match child {
            Condition::And(_, _) | Condition::Or(_, _) => {
                // Same effective operator: merge into this group
                if std::mem::discriminant(child) == own_op && child_negated == negated {
                    write_group_children(xml, statement, child, child_negated, indent)?;
                } else {
                    let op_token = filter_op_token(child, child_negated);
                    let _ = writeln!(
                        xml,
                        "{:indent$}<filter type=\"{}\">",
                        "",
                        op_token,
                        indent = indent
                    );
                    write_group_children(xml, statement, child, child_negated, indent + 2)?;
                    let _ = writeln!(xml, "{:indent$}</filter>", "", indent = indent);
                }
            }
            leaf => write_condition(xml, statement, leaf, child_negated, indent)?,
        }
    }

    Ok(())
}

/// Emit one condition element
fn write_condition(
    xml: &mut String,
    statement: &SelectStatement,
    condition: &Condition,
    negated: bool,
    indent: usize,
) -> GenerationResult<()> {
    let column = match condition {
        Condition::Comparison { column, .. }
        | Condition::InList { column, .. }
        | Condition::IsNull { column, .. } => column,
        _ => unreachable!("condition emission called on a group"),
    };

    if classify(statement, column.table.as_deref())? != Target::Entity {
        return Err(GenerationError::UnsupportedConstruct {
            construct: format!("filter on joined table column '{}'", column),
        });
    }

    match condition {
        Condition::Comparison {
            column,
            operator,
            value,
        } => {
            let xml_op = comparison_operator(*operator, negated);
            let _ = writeln!(
                xml,
                "{:indent$}<condition attribute=\"{}\" operator=\"{}\" value=\"{}\"/>",
                "",
                escape_attr(&column.name),
                xml_op.token(),
                escape_attr(&value.as_text()),
                indent = indent
            );
        }
        Condition::InList { column, values } => {
            let xml_op = if negated {
                XmlOperator::NotIn
            } else {
                XmlOperator::In
            };
            let _ = writeln!(
                xml,
                "{:indent$}<condition attribute=\"{}\" operator=\"{}\">",
                "",
                escape_attr(&column.name),
                xml_op.token(),
                indent = indent
            );
            for value in values {
                let _ = writeln!(
                    xml,
                    "{:indent$}<value>{}</value>",
                    "",
                    escape_text(&value.as_text()),
                    indent = indent + 2
                );
            }
            let _ = writeln!(xml, "{:indent$}</condition>", "", indent = indent);
        }
        Condition::IsNull { column, negated: is_not } => {
            let null_test = *is_not != negated;
            let xml_op = if null_test {
                XmlOperator::NotNull
            } else {
                XmlOperator::Null
            };
            let _ = writeln!(
                xml,
                "{:indent$}<condition attribute=\"{}\" operator=\"{}\"/>",
                "",
                escape_attr(&column.name),
                xml_op.token(),
                indent = indent
            );
        }
        _ => unreachable!(),
    }

    Ok(())
}

/// Map a SQL comparison operator to its query-XML token, inverting it
/// when the condition sits under a NOT
fn comparison_operator(operator: ComparisonOperator, negated: bool) -> XmlOperator {
    match (operator, negated) {
        (ComparisonOperator::Equals, false) => XmlOperator::Eq,
        (ComparisonOperator::Equals, true) => XmlOperator::Ne,
        (ComparisonOperator::NotEquals, false) => XmlOperator::Ne,
        (ComparisonOperator::NotEquals, true) => XmlOperator::Eq,
        (ComparisonOperator::LessThan, false) => XmlOperator::Lt,
        (ComparisonOperator::LessThan, true) => XmlOperator::Ge,
        (ComparisonOperator::GreaterThan, false) => XmlOperator::Gt,
        (ComparisonOperator::GreaterThan, true) => XmlOperator::Le,
        (ComparisonOperator::LessEquals, false) => XmlOperator::Le,
        (ComparisonOperator::LessEquals, true) => XmlOperator::Gt,
        (ComparisonOperator::GreaterEquals, false) => XmlOperator::Ge,
        (ComparisonOperator::GreaterEquals, true) => XmlOperator::Lt,
        (ComparisonOperator::Like, false) => XmlOperator::Like,
        (ComparisonOperator::Like, true) => XmlOperator::NotLike,
    }
}

/// Emit one link element for a join clause. The ON pair is oriented by
/// the side whose qualifier names the joined table; the other side must
/// belong to the primary entity.
fn write_link(
    xml: &mut String,
    statement: &SelectStatement,
    join: &JoinClause,
    attributes: &[StagedAttribute],
) -> GenerationResult<()> {
    let belongs_to_join = |column: &ColumnRef| -> bool {
        match column.table.as_deref() {
            Some(qualifier) => {
                qualifier == join.table.name || join.table.alias.as_deref() == Some(qualifier)
            }
            None => false,
        }
    };

    let (linked, parent) = match (
        belongs_to_join(&join.left_column),
        belongs_to_join(&join.right_column),
    ) {
        (true, false) => (&join.left_column, &join.right_column),
        (false, true) => (&join.right_column, &join.left_column),
        _ => {
            return Err(GenerationError::UnsupportedConstruct {
                construct: format!(
                    "join condition '{} = {}' must relate '{}' to the primary table",
                    join.left_column, join.right_column, join.table.name
                ),
            });
        }
    };

    if classify(statement, parent.table.as_deref())? != Target::Entity {
        return Err(GenerationError::UnsupportedConstruct {
            construct: format!(
                "join chained through another joined table: '{} = {}'",
                join.left_column, join.right_column
            ),
        });
    }

    let link_type = match join.kind {
        JoinKind::Inner => LinkType::Inner,
        JoinKind::Left => LinkType::Outer,
    };

    let _ = write!(
        xml,
        "    <link name=\"{}\" from=\"{}\" to=\"{}\" type=\"{}\"",
        escape_attr(&join.table.name),
        escape_attr(&linked.name),
        escape_attr(&parent.name),
        link_type.token()
    );
    if let Some(alias) = &join.table.alias {
        let _ = write!(xml, " alias=\"{}\"", escape_attr(alias));
    }

    if attributes.is_empty() {
        xml.push_str("/>\n");
    } else {
        xml.push_str(">\n");
        for attr in attributes {
            write_attribute_element(xml, attr, 6);
        }
        xml.push_str("    </link>\n");
    }

    Ok(())
}

/// Escape an XML attribute value
fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape XML text content
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
