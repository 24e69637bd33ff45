use anyhow::Result;
use queryxml::xml::model::{FilterNode, LinkType, LogicalOp, XmlOperator};
use queryxml::xml::reader::{read, ReadError};

#[test]
fn test_full_document() -> Result<()> {
    let model = read(
        r#"<?xml version="1.0" encoding="utf-8"?>
           <query distinct="true" aggregate="true" top="100">
             <entity name="opportunity">
               <attribute name="statecode" groupby="true"/>
               <attribute name="estimatedvalue" aggregate="sum" alias="total"/>
               <filter type="or">
                 <condition attribute="statecode" operator="eq" value="0"/>
                 <filter type="and">
                   <condition attribute="estimatedvalue" operator="ge" value="10000"/>
                   <condition attribute="closeprobability" operator="gt" value="50"/>
                 </filter>
               </filter>
               <link name="account" from="accountid" to="customerid" type="outer" alias="acc">
                 <attribute name="name"/>
               </link>
               <order attribute="statecode"/>
               <order attribute="estimatedvalue" descending="true"/>
             </entity>
           </query>"#,
    )?;

    assert_eq!(model.entity_name, "opportunity");
    assert!(model.distinct);
    assert!(model.aggregate);
    assert_eq!(model.top, Some(100));
    assert_eq!(model.grouped_attributes(), vec!["statecode"]);

    let total = &model.attributes[1];
    assert_eq!(total.aggregate.as_deref(), Some("sum"));
    assert_eq!(total.alias.as_deref(), Some("total"));

    let link = &model.links[0];
    assert_eq!(link.link_type, LinkType::Outer);
    assert_eq!(link.alias.as_deref(), Some("acc"));
    assert_eq!(link.attributes[0].name, "name");

    assert_eq!(model.orders.len(), 2);
    assert!(!model.orders[0].descending);
    assert!(model.orders[1].descending);

    Ok(())
}

#[test]
fn test_nested_filters_keep_their_depth() -> Result<()> {
    let model = read(
        r#"<query>
             <entity name="t">
               <filter type="and">
                 <condition attribute="a" operator="eq" value="1"/>
                 <filter type="or">
                   <condition attribute="b" operator="eq" value="2"/>
                   <filter type="and">
                     <condition attribute="c" operator="eq" value="3"/>
                   </filter>
                 </filter>
               </filter>
             </entity>
           </query>"#,
    )?;

    let FilterNode::Group { logical, children } = model.filter.unwrap() else {
        panic!("expected a group at the root");
    };
    assert_eq!(logical, LogicalOp::And);

    let FilterNode::Group { logical, children } = &children[1] else {
        panic!("expected a nested group");
    };
    assert_eq!(*logical, LogicalOp::Or);

    let FilterNode::Group { logical, .. } = &children[1] else {
        panic!("expected a doubly nested group");
    };
    assert_eq!(*logical, LogicalOp::And);

    Ok(())
}

#[test]
fn test_aggregate_flag_is_inferred_from_attributes() -> Result<()> {
    // No aggregate="true" on the root, but an aggregate attribute exists
    let model = read(
        r#"<query>
             <entity name="contact">
               <attribute name="contactid" aggregate="count" alias="cnt"/>
             </entity>
           </query>"#,
    )?;

    assert!(model.aggregate);

    Ok(())
}

#[test]
fn test_aggregate_flag_is_inferred_from_link_attributes() -> Result<()> {
    // The only aggregate sits on a link attribute, not the entity
    let model = read(
        r#"<query>
             <entity name="account">
               <link name="contact" from="parentcustomerid" to="accountid">
                 <attribute name="contactid" aggregate="count" alias="contacts"/>
               </link>
             </entity>
           </query>"#,
    )?;

    assert!(model.aggregate);

    Ok(())
}

#[test]
fn test_link_type_defaults_to_inner() -> Result<()> {
    let model = read(
        r#"<query>
             <entity name="account">
               <link name="contact" from="contactid" to="primarycontactid"/>
             </entity>
           </query>"#,
    )?;

    assert_eq!(model.links[0].link_type, LinkType::Inner);
    assert!(model.links[0].alias.is_none());

    Ok(())
}

#[test]
fn test_not_in_condition() -> Result<()> {
    let model = read(
        r#"<query>
             <entity name="account">
               <filter type="and">
                 <condition attribute="statecode" operator="not-in">
                   <value>2</value>
                   <value>3</value>
                 </condition>
               </filter>
             </entity>
           </query>"#,
    )?;

    let FilterNode::Group { children, .. } = model.filter.unwrap() else {
        panic!("expected a group");
    };
    let FilterNode::Condition {
        operator, values, ..
    } = &children[0]
    else {
        panic!("expected a condition");
    };
    assert_eq!(*operator, XmlOperator::NotIn);
    assert_eq!(values, &vec!["2".to_string(), "3".to_string()]);

    Ok(())
}

#[test]
fn test_malformed_document_is_a_read_error() {
    let err = read("<query><entity name=\"t\">").unwrap_err();
    assert!(matches!(err, ReadError::Malformed(_)));
}

#[test]
fn test_non_query_root_is_rejected() {
    let err = read("<fetch><entity name=\"t\"/></fetch>").unwrap_err();
    assert_eq!(
        err,
        ReadError::NotAQuery {
            found: "fetch".to_string()
        }
    );
}

#[test]
fn test_incomplete_link_names_the_missing_attribute() {
    let err = read(
        r#"<query>
             <entity name="account">
               <link name="contact" from="contactid"/>
             </entity>
           </query>"#,
    )
    .unwrap_err();

    assert_eq!(
        err,
        ReadError::IncompleteLink {
            attribute: "to".to_string()
        }
    );
}
