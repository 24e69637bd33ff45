// Query-XML Module
//
// Everything on the XML side of the transpiler: the document writer,
// the structural validator, the element-tree scanner, the reader, and
// the reverse SQL generator.

pub mod model;
pub mod reader;
pub mod scan;
pub mod sqlgen;
pub mod validator;
pub mod writer;

pub use self::model::QueryXmlModel;
pub use self::reader::{read, ReadError};
pub use self::sqlgen::TranspiledSql;
pub use self::validator::{validate, ValidationError};
pub use self::writer::{generate, GenerationError};
