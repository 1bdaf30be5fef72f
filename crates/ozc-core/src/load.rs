use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::{Map, Number, Value};
use url::Url;

use crate::error::{DocumentError, LoadError};

/// Absolute location of a document, without any fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(Url);

impl Location {
    /// Parse a user-supplied path or URL. Relative paths are anchored at the
    /// current directory.
    pub fn parse(input: &str) -> Result<Self, LoadError> {
        if input.contains("://") {
            let mut url = Url::parse(input).map_err(|e| LoadError::InvalidLocation {
                location: input.to_string(),
                reason: e.to_string(),
            })?;
            url.set_fragment(None);
            return Ok(Self(url));
        }
        let path = Path::new(input);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|source| LoadError::Io {
                    location: input.to_string(),
                    source,
                })?
                .join(path)
        };
        Url::from_file_path(&absolute)
            .map(Self)
            .map_err(|()| LoadError::InvalidLocation {
                location: input.to_string(),
                reason: "not an absolute file path".to_string(),
            })
    }

    /// Resolve the document part of a `$ref` against this location.
    /// An empty reference is this document.
    pub fn join(&self, reference: &str) -> Result<Self, LoadError> {
        if reference.is_empty() {
            return Ok(self.clone());
        }
        let mut url = self.0.join(reference).map_err(|e| LoadError::InvalidLocation {
            location: reference.to_string(),
            reason: e.to_string(),
        })?;
        url.set_fragment(None);
        Ok(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.0.scheme(), "http" | "https")
    }

    fn file_name(&self) -> Option<&str> {
        self.0
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
    }

    pub fn extension(&self) -> Option<&str> {
        self.file_name()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
    }

    pub fn file_stem(&self) -> Option<&str> {
        self.file_name()
            .map(|name| name.split_once('.').map_or(name, |(stem, _)| stem))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fetches raw document text. Implementations must be shareable across
/// threads because the resolver fetches external documents concurrently.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, location: &Location) -> Result<String, LoadError>;
}

/// Loads `file://` locations from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn load(&self, location: &Location) -> Result<String, LoadError> {
        if location.as_url().scheme() != "file" {
            return Err(LoadError::Unsupported(location.to_string()));
        }
        let path = location
            .as_url()
            .to_file_path()
            .map_err(|()| LoadError::InvalidLocation {
                location: location.to_string(),
                reason: "not a local file".to_string(),
            })?;
        log::debug!("reading {}", path.display());
        fs::read_to_string(&path).map_err(|source| LoadError::Io {
            location: location.to_string(),
            source,
        })
    }
}

/// Serves documents from memory, keyed by location. Used by tests and by
/// callers that already hold the document text.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<Location, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, text: &str) -> Result<Self, LoadError> {
        self.documents
            .insert(Location::parse(location)?, text.to_string());
        Ok(self)
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, location: &Location) -> Result<String, LoadError> {
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| LoadError::Io {
                location: location.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}

/// Parse document text into a generic tree. The extension decides the
/// syntax; when it is missing or unknown, YAML is tried first, then JSON.
pub fn parse_document_text(text: &str, location: &Location) -> Result<Value, DocumentError> {
    match location.extension() {
        Some("json") => Ok(serde_json::from_str(text)?),
        Some("yaml" | "yml") => parse_yaml(text),
        _ => parse_yaml(text).or_else(|yaml_err| {
            log::debug!("{location} is not YAML ({yaml_err}), trying JSON");
            serde_json::from_str(text).map_err(|_| DocumentError::Unparseable {
                location: location.to_string(),
            })
        }),
    }
}

fn parse_yaml(text: &str) -> Result<Value, DocumentError> {
    let mut yaml: serde_yaml_ng::Value = serde_yaml_ng::from_str(text)?;
    yaml.apply_merge()?;
    yaml_to_json(yaml)
}

/// Convert a YAML tree to JSON, stringifying scalar mapping keys such as
/// unquoted status codes.
fn yaml_to_json(value: serde_yaml_ng::Value) -> Result<Value, DocumentError> {
    use serde_yaml_ng::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut out = Map::new();
            for (key, value) in mapping {
                out.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(out)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml_ng::Value) -> Result<String, DocumentError> {
    use serde_yaml_ng::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(DocumentError::Malformed(format!(
            "unsupported mapping key: {other:?}"
        ))),
    }
}
