//! Dialect normalization: Swagger 2.0, OpenAPI 3.0 and 3.1 documents are all
//! rewritten into the 3.1 shape before anything else looks at them.

mod openapi30;
mod swagger2;
pub mod walk;

use std::fmt;

use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::DocumentError;

pub use openapi30::normalize_schema;

/// The dialect a document declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialect {
    Swagger2,
    OpenApi30,
    OpenApi31,
    Unknown(String),
}

impl Dialect {
    /// Detect the dialect from the `swagger`/`openapi` version field. YAML
    /// writers sometimes leave versions unquoted, so numbers are accepted.
    pub fn sniff(document: &Value) -> Self {
        if let Some(version) = document.get("swagger") {
            let version = version_string(version);
            return if version == "2" || version.starts_with("2.") {
                Dialect::Swagger2
            } else {
                Dialect::Unknown(format!("swagger {version}"))
            };
        }
        match document.get("openapi").map(version_string) {
            Some(v) if v == "3" || v.starts_with("3.0") => Dialect::OpenApi30,
            Some(v) if v.starts_with("3.1") => Dialect::OpenApi31,
            Some(v) => Dialect::Unknown(v),
            None => Dialect::Unknown(String::new()),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Swagger2 => write!(f, "Swagger 2.0"),
            Dialect::OpenApi30 => write!(f, "OpenAPI 3.0"),
            Dialect::OpenApi31 => write!(f, "OpenAPI 3.1"),
            Dialect::Unknown(version) => write!(f, "unknown version {version:?}"),
        }
    }
}

fn version_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A document in canonical 3.1 shape.
#[derive(Debug)]
pub struct Normalized {
    pub document: Value,
    /// The dialect the input declared, before normalization.
    pub dialect: Dialect,
    pub diagnostics: Diagnostics,
}

/// Normalize the root document. Fails only when the document is not a
/// mapping or lacks a required top-level key; an unknown version passes
/// through untouched with a diagnostic.
pub fn normalize(mut document: Value) -> Result<Normalized, DocumentError> {
    if !document.is_object() {
        return Err(DocumentError::Malformed(
            "document root must be a mapping".to_string(),
        ));
    }
    require(&document, "info")?;

    let dialect = Dialect::sniff(&document);
    let mut diagnostics = Diagnostics::new();
    log::debug!("normalizing {dialect:?} document");

    match &dialect {
        Dialect::Swagger2 => {
            require(&document, "paths")?;
            document = swagger2::to_openapi30(document)?;
            openapi30::to_openapi31(&mut document);
        }
        Dialect::OpenApi30 => {
            require(&document, "paths")?;
            openapi30::to_openapi31(&mut document);
        }
        Dialect::OpenApi31 => {}
        Dialect::Unknown(version) => {
            let shown = if version.is_empty() {
                "no version field".to_string()
            } else {
                format!("version `{version}`")
            };
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnknownVersion,
                "document",
                format!("unrecognized dialect ({shown}), passing through unchanged"),
            ));
        }
    }

    Ok(Normalized {
        document,
        dialect,
        diagnostics,
    })
}

fn require(document: &Value, key: &str) -> Result<(), DocumentError> {
    if document.get(key).is_none() {
        return Err(DocumentError::MissingField(key.to_string()));
    }
    Ok(())
}

/// Normalize a document loaded only as the target of an external `$ref`.
/// No top-level keys are required; documents without a version field are
/// returned as-is and their schemas go through [`normalize_fragment`] when
/// they are used.
pub fn normalize_external(mut document: Value) -> Value {
    match Dialect::sniff(&document) {
        Dialect::Swagger2 => match swagger2::to_openapi30(document.clone()) {
            Ok(mut converted) => {
                openapi30::to_openapi31(&mut converted);
                converted
            }
            Err(_) => document,
        },
        Dialect::OpenApi30 => {
            openapi30::to_openapi31(&mut document);
            document
        }
        _ => document,
    }
}

/// Apply the schema-level 3.0 → 3.1 rewrites to one schema and everything
/// nested in it. Already-3.1 schemas are unchanged.
pub fn normalize_fragment(schema: &mut Value) {
    walk::visit_schema(schema, &mut normalize_schema);
}
