use anyhow::{anyhow, Result};
use queryxml::metadata::StaticMetadata;
use queryxml::sql::parser::Parser;
use queryxml::xml::model::{FilterNode, LinkType, LogicalOp, XmlOperator};
use queryxml::xml::{reader, validator, writer, GenerationError};

fn transpile(sql: &str, lookup: &StaticMetadata) -> Result<String> {
    let statement = Parser::new(sql)
        .parse_select()
        .map_err(|e| anyhow!("Parse error: {:?}", e))?;
    writer::generate(&statement, lookup).map_err(|e| anyhow!("Generation error: {:?}", e))
}

#[test]
fn test_filter_order_and_attributes() -> Result<()> {
    let lookup = StaticMetadata::new();
    let xml = transpile(
        "SELECT name, revenue FROM account WHERE revenue > 1000000 ORDER BY revenue DESC",
        &lookup,
    )?;

    let model = reader::read(&xml)?;
    assert_eq!(model.entity_name, "account");
    assert_eq!(model.attributes.len(), 2);
    assert_eq!(model.orders.len(), 1);
    assert!(model.orders[0].descending);

    match model.filter.unwrap() {
        FilterNode::Group { logical, children } => {
            assert_eq!(logical, LogicalOp::And);
            assert_eq!(
                children,
                vec![FilterNode::Condition {
                    attribute: "revenue".to_string(),
                    operator: XmlOperator::Gt,
                    value: Some("1000000".to_string()),
                    values: vec![],
                }]
            );
        }
        other => panic!("expected a single-condition group, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_aggregate_document() -> Result<()> {
    let lookup = StaticMetadata::new();
    let xml = transpile(
        "SELECT statecode, COUNT(*) AS cnt FROM contact GROUP BY statecode",
        &lookup,
    )?;

    assert!(xml.contains("aggregate=\"true\""));

    let model = reader::read(&xml)?;
    assert!(model.aggregate);
    assert_eq!(model.grouped_attributes(), vec!["statecode"]);

    let count = model
        .attributes
        .iter()
        .find(|attr| attr.aggregate.is_some())
        .expect("count attribute expected");
    assert_eq!(count.name, "*");
    assert_eq!(count.aggregate.as_deref(), Some("count"));
    assert_eq!(count.alias.as_deref(), Some("cnt"));

    Ok(())
}

#[test]
fn test_join_becomes_link_element() -> Result<()> {
    let lookup = StaticMetadata::new();
    let xml = transpile(
        "SELECT a.name, c.fullname FROM account a \
         INNER JOIN contact c ON a.primarycontactid = c.contactid",
        &lookup,
    )?;

    let model = reader::read(&xml)?;
    assert_eq!(model.links.len(), 1);

    let link = &model.links[0];
    assert_eq!(link.name, "contact");
    assert_eq!(link.link_type, LinkType::Inner);
    assert_eq!(link.alias.as_deref(), Some("c"));
    assert_eq!(link.from_column, "contactid");
    assert_eq!(link.to_column, "primarycontactid");
    assert_eq!(link.attributes.len(), 1);
    assert_eq!(link.attributes[0].name, "fullname");

    // The joined column stays out of the entity's own attribute list
    assert_eq!(model.attributes.len(), 1);
    assert_eq!(model.attributes[0].name, "name");

    Ok(())
}

#[test]
fn test_left_join_maps_to_outer_link() -> Result<()> {
    let lookup = StaticMetadata::new();
    let xml = transpile(
        "SELECT name FROM account LEFT JOIN contact c ON c.contactid = account.primarycontactid",
        &lookup,
    )?;

    let model = reader::read(&xml)?;
    assert_eq!(model.links[0].link_type, LinkType::Outer);

    Ok(())
}

#[test]
fn test_wildcard_expansion_excludes_virtual_columns() -> Result<()> {
    let lookup = StaticMetadata::new()
        .with_entity("t", ["id", "name", "ownername"])
        .with_virtual("ownername");

    let xml = transpile("SELECT * FROM t", &lookup)?;
    let model = reader::read(&xml)?;

    let names: Vec<&str> = model.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name"]);

    Ok(())
}

#[test]
fn test_wildcard_without_metadata_fails() {
    let lookup = StaticMetadata::new();
    let statement = Parser::new("SELECT * FROM unknown").parse_select().unwrap();

    let err = writer::generate(&statement, &lookup).unwrap_err();
    assert_eq!(
        err,
        GenerationError::WildcardExpansionUnavailable {
            entity: "unknown".to_string()
        }
    );
}

#[test]
fn test_selecting_virtual_column_fails() {
    let lookup = StaticMetadata::new().with_virtual("ownername");
    let statement = Parser::new("SELECT ownername FROM account")
        .parse_select()
        .unwrap();

    let err = writer::generate(&statement, &lookup).unwrap_err();
    assert_eq!(
        err,
        GenerationError::VirtualColumnSelected {
            column: "ownername".to_string()
        }
    );
}

#[test]
fn test_order_by_joined_column_is_unsupported() {
    let lookup = StaticMetadata::new();
    let statement = Parser::new(
        "SELECT name FROM account INNER JOIN contact c ON c.contactid = account.primarycontactid \
         ORDER BY c.fullname",
    )
    .parse_select()
    .unwrap();

    let err = writer::generate(&statement, &lookup).unwrap_err();
    assert!(matches!(err, GenerationError::UnsupportedConstruct { .. }));
}

#[test]
fn test_not_is_lowered_exactly() -> Result<()> {
    let lookup = StaticMetadata::new();
    let xml = transpile(
        "SELECT name FROM account WHERE NOT (statecode = 0 AND revenue > 100)",
        &lookup,
    )?;

    // De Morgan: NOT(a AND b) becomes ne/le under an OR group
    let model = reader::read(&xml)?;
    match model.filter.unwrap() {
        FilterNode::Group { logical, children } => {
            assert_eq!(logical, LogicalOp::Or);
            assert_eq!(children.len(), 2);
            assert!(matches!(
                children[0],
                FilterNode::Condition {
                    operator: XmlOperator::Ne,
                    ..
                }
            ));
            assert!(matches!(
                children[1],
                FilterNode::Condition {
                    operator: XmlOperator::Le,
                    ..
                }
            ));
        }
        other => panic!("expected an OR group, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_nested_condition_tree_is_mirrored() -> Result<()> {
    let lookup = StaticMetadata::new();
    let xml = transpile(
        "SELECT name FROM account \
         WHERE statecode = 0 AND (revenue > 1000 OR employees > 50)",
        &lookup,
    )?;

    let model = reader::read(&xml)?;
    match model.filter.unwrap() {
        FilterNode::Group { logical, children } => {
            assert_eq!(logical, LogicalOp::And);
            assert_eq!(children.len(), 2);
            assert!(matches!(
                &children[1],
                FilterNode::Group {
                    logical: LogicalOp::Or,
                    children
                } if children.len() == 2
            ));
        }
        other => panic!("expected an AND group, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_generated_documents_validate_cleanly() -> Result<()> {
    let lookup = StaticMetadata::new().with_entity("account", ["id", "name"]);

    let queries = [
        "SELECT name FROM account",
        "SELECT DISTINCT name, revenue FROM account WHERE name LIKE 'A%' TOP 25",
        "SELECT * FROM account",
        "SELECT statecode, COUNT(*) AS cnt FROM account GROUP BY statecode",
        "SELECT a.name, c.fullname FROM account a \
         INNER JOIN contact c ON a.primarycontactid = c.contactid",
        "SELECT name FROM account WHERE statecode IN (0, 1) OR parentid IS NULL",
        "SELECT name FROM account WHERE NOT name LIKE 'test%'",
    ];

    for sql in queries {
        let xml = transpile(sql, &lookup)?;
        validator::validate(&xml)
            .map_err(|errors| anyhow!("'{}' generated invalid XML: {:?}", sql, errors))?;
    }

    Ok(())
}

#[test]
fn test_string_values_are_escaped() -> Result<()> {
    let lookup = StaticMetadata::new();
    let xml = transpile(
        "SELECT name FROM account WHERE name = 'Smith & Sons <Ltd>'",
        &lookup,
    )?;

    assert!(xml.contains("value=\"Smith &amp; Sons &lt;Ltd&gt;\""));

    // And the reader decodes them back
    let model = reader::read(&xml)?;
    match model.filter.unwrap() {
        FilterNode::Group { children, .. } => match &children[0] {
            FilterNode::Condition { value, .. } => {
                assert_eq!(value.as_deref(), Some("Smith & Sons <Ltd>"));
            }
            other => panic!("expected a condition, got {:?}", other),
        },
        other => panic!("expected a group, got {:?}", other),
    }

    Ok(())
}
