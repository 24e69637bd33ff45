// Query Transpiler Library
//
// Bidirectional transpiler between a restricted SQL dialect and the
// query-XML document format of a remote tabular data platform. Forward:
// SQL -> lexer -> parser -> AST -> query-XML writer. Reverse: query-XML
// -> validator -> reader -> structural model -> SQL generator. Both
// paths are pure, stateless transformations.

pub mod metadata;
pub mod sql;
pub mod transpile;
pub mod xml;

// Re-export key items for convenient access
pub use metadata::{MetadataLookup, StaticMetadata};
pub use sql::ast::SelectStatement;
pub use sql::parser::{ParseError, Parser};
pub use transpile::{
    transpile_query_xml_to_sql, transpile_sql_to_query_xml, validate_query_xml, Diagnostic,
};
pub use xml::model::QueryXmlModel;
pub use xml::sqlgen::TranspiledSql;
pub use xml::validator::ValidationError;
