// Transpiler Facade
//
// The three operations the rest of the IDE add-in calls. Both directions
// are pure, synchronous transformations; the only external capability is
// the read-only metadata lookup used for wildcard expansion and
// virtual-column classification.

use log::debug;
use serde::Serialize;

use crate::metadata::{split_virtual_columns, MetadataLookup};
use crate::sql::parser::{ParseError, Parser};
use crate::xml::reader::ReadError;
use crate::xml::sqlgen::TranspiledSql;
use crate::xml::writer::GenerationError;
use crate::xml::{reader, sqlgen, validator, writer};

/// Host-facing diagnostic: a stable code, a human-readable message, and
/// the 1-based source position when one is known
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl Diagnostic {
    fn syntax(error: &ParseError) -> Self {
        let position = error.position();
        Diagnostic {
            code: "syntax",
            message: error.to_string(),
            line: position.map(|(line, _)| line),
            column: position.map(|(_, column)| column),
        }
    }

    fn generation(error: &GenerationError) -> Self {
        Diagnostic {
            code: "generation",
            message: error.to_string(),
            line: None,
            column: None,
        }
    }

    fn validation(error: &validator::ValidationError) -> Self {
        Diagnostic {
            code: "validation",
            message: error.to_string(),
            line: None,
            column: None,
        }
    }

    fn read(error: &ReadError) -> Self {
        Diagnostic {
            code: "read",
            message: error.to_string(),
            line: None,
            column: None,
        }
    }
}

/// Forward direction: SQL text to a query-XML document. Either a fully
/// valid document is produced or none is; there is no best-effort mode.
pub fn transpile_sql_to_query_xml(
    text: &str,
    lookup: &dyn MetadataLookup,
) -> Result<String, Vec<Diagnostic>> {
    debug!("transpiling {} bytes of SQL", text.len());

    let statement = Parser::new(text)
        .parse_select()
        .map_err(|err| vec![Diagnostic::syntax(&err)])?;

    writer::generate(&statement, lookup).map_err(|err| vec![Diagnostic::generation(&err)])
}

/// Reverse direction: query-XML to SQL. The document is validated, read
/// into the structural model, stripped of virtual columns (which become
/// result-mapping hints), and rendered; approximations show up as
/// warnings on the output rather than failures.
pub fn transpile_query_xml_to_sql(
    text: &str,
    lookup: &dyn MetadataLookup,
) -> Result<TranspiledSql, Vec<Diagnostic>> {
    debug!("transpiling {} bytes of query-XML", text.len());

    validator::validate(text)
        .map_err(|errors| errors.iter().map(Diagnostic::validation).collect::<Vec<_>>())?;

    let mut model = reader::read(text).map_err(|err| vec![Diagnostic::read(&err)])?;

    let resolved = split_virtual_columns(&model, lookup);
    let mut warnings = Vec::new();
    for hint in &resolved.result_hints {
        warnings.push(format!(
            "virtual column '{}' cannot appear in a select list; surfaced as a result-mapping hint",
            hint
        ));
    }
    model.attributes = resolved.columns;

    let mut output = sqlgen::generate(&model);
    output.warnings.splice(0..0, warnings);
    output.result_hints = resolved.result_hints;

    Ok(output)
}

/// Structural validation only; an empty list means the document passed
pub fn validate_query_xml(text: &str) -> Vec<Diagnostic> {
    match validator::validate(text) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(Diagnostic::validation).collect(),
    }
}
