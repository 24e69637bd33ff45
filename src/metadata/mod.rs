// Metadata Lookup Module
//
// Read-only metadata capability consulted during wildcard expansion and
// virtual-column classification. Virtual columns are result-only
// pseudo-attributes (a lookup's display label, a formatted value) that
// cannot appear in a query's own select list or predicates.

use std::collections::{HashMap, HashSet};

use crate::xml::model::{AttributeSelection, QueryXmlModel};

/// Read-only entity metadata. Implementations must tolerate concurrent
/// reads; the transpiler never mutates them.
pub trait MetadataLookup: Sync {
    /// Literal queryable attributes of an entity, for `*` expansion
    fn list_attributes(&self, entity_name: &str) -> Vec<String>;

    /// Whether an attribute is a result-only pseudo-column
    fn is_virtual_column(&self, attribute_name: &str) -> bool;
}

/// In-memory metadata, used by tests and the CLI. The IDE host supplies
/// a cache-backed implementation instead.
#[derive(Debug, Default, Clone)]
pub struct StaticMetadata {
    entities: HashMap<String, Vec<String>>,
    virtual_columns: HashSet<String>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        StaticMetadata::default()
    }

    pub fn with_entity(
        mut self,
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.entities.insert(
            name.into(),
            attributes.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn with_virtual(mut self, attribute: impl Into<String>) -> Self {
        self.virtual_columns.insert(attribute.into());
        self
    }
}

impl MetadataLookup for StaticMetadata {
    fn list_attributes(&self, entity_name: &str) -> Vec<String> {
        self.entities.get(entity_name).cloned().unwrap_or_default()
    }

    fn is_virtual_column(&self, attribute_name: &str) -> bool {
        self.virtual_columns.contains(attribute_name)
    }
}

/// Attribute list after virtual-column resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumns {
    /// Attributes that can stand in a SQL select list
    pub columns: Vec<AttributeSelection>,
    /// Virtual attributes, surfaced as result-mapping hints instead
    pub result_hints: Vec<String>,
}

/// Partition a model's attribute list into SQL-selectable columns and
/// result-mapping hints for virtual columns
pub fn split_virtual_columns(
    model: &QueryXmlModel,
    lookup: &dyn MetadataLookup,
) -> ResolvedColumns {
    let mut columns = Vec::new();
    let mut result_hints = Vec::new();

    for attribute in &model.attributes {
        if lookup.is_virtual_column(&attribute.name) {
            result_hints.push(attribute.name.clone());
        } else {
            columns.push(attribute.clone());
        }
    }

    ResolvedColumns {
        columns,
        result_hints,
    }
}
