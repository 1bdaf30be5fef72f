use thiserror::Error;

/// Failure to fetch the raw text of a document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported document location: {0}")]
    Unsupported(String),

    #[error("invalid document location {location}: {reason}")]
    InvalidLocation { location: String, reason: String },
}

/// Fatal problems with the input document. Any of these aborts the run
/// before compilation starts.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{location} is neither valid YAML nor valid JSON")]
    Unparseable { location: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// A `$ref` that could not be turned into a schema. Fatal for the
/// referencing named type only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("reference target not found: {0}")]
    RefTargetNotFound(String),

    #[error("failed to load {location}: {message}")]
    Fetch { location: String, message: String },

    #[error("target of {0} is not a schema: {1}")]
    NotASchema(String, String),

    #[error("{0} only refers to itself")]
    Circular(String),

    #[error("target of {0} is malformed: {1}")]
    Malformed(String, String),
}

/// Failure to read or parse the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml_ng::Error,
    },
}
