pub mod operation;
pub mod schema;
pub mod security;
pub mod spec;

use serde::Deserialize;
use serde_json::Value;

use crate::error::DocumentError;
use spec::OpenApiSpec;

/// Deserialize a normalized (3.1-shaped) document tree into the typed model.
pub fn from_value(document: &Value) -> Result<OpenApiSpec, DocumentError> {
    if document.get("info").is_none() {
        return Err(DocumentError::MissingField("info".to_string()));
    }
    Ok(OpenApiSpec::deserialize(document)?)
}

/// Deserialize a single schema found at some pointer inside a document.
pub fn schema_from_value(value: &Value) -> Result<schema::SchemaOrRef, serde_json::Error> {
    schema::SchemaOrRef::deserialize(value)
}
