use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// Settings for one generation run, loaded from `.ozc.yaml` and overridden
/// by command-line flags. Read once at start-up and never mutated after.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Path or URL of the API description.
    pub input: String,
    /// Directory the generated tree is written to.
    pub output: String,
    /// Emit client call functions.
    pub client: bool,
    /// Emit server request validators.
    pub server: bool,
    /// Reject unknown keys on objects that do not declare
    /// `additionalProperties`.
    pub strict_objects: bool,
    pub response_validation: ResponseValidation,
    pub naming: NamingConfig,
    /// Run biome over the generated tree.
    pub format: bool,
    /// Base URL baked into the generated client config. Defaults to the
    /// first server in the document.
    pub base_url: Option<String>,
    pub no_jsdoc: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            input: "openapi.yaml".to_string(),
            output: "src/generated".to_string(),
            client: true,
            server: false,
            strict_objects: false,
            response_validation: ResponseValidation::Lazy,
            naming: NamingConfig::default(),
            format: false,
            base_url: None,
            no_jsdoc: false,
        }
    }
}

/// When generated clients parse response bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseValidation {
    /// Return raw data; callers parse with the exported response schemas.
    #[default]
    Lazy,
    /// Parse every response body before returning it.
    Eager,
}

/// Naming strategy and aliases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub strategy: NamingStrategy,
    /// Map from resolved operation name (operationId or route-derived) to custom alias.
    pub aliases: IndexMap<String, String>,
}

/// How operation names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    #[default]
    UseOperationId,
    UseRouteBased,
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".ozc.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<GenerationConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# ozc configuration
input: openapi.yaml
output: src/generated

client: true                # emit typed client functions
server: false               # emit request validators for server handlers
strict_objects: false       # reject unknown keys unless additionalProperties says otherwise
response_validation: lazy   # lazy | eager (parse every response body in the client)

naming:
  strategy: use_operation_id  # use_operation_id | use_route_based
  aliases: {}
    # listPets: pets            # operation name → custom name

format: false               # run biome on the generated tree
# base_url: https://api.example.com
no_jsdoc: false
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GenerationConfig::default();
        assert_eq!(config.input, "openapi.yaml");
        assert_eq!(config.output, "src/generated");
        assert!(config.client);
        assert!(!config.server);
        assert_eq!(config.response_validation, ResponseValidation::Lazy);
        assert_eq!(config.naming.strategy, NamingStrategy::UseOperationId);
        assert!(config.naming.aliases.is_empty());
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
input: spec.yaml
output: out
server: true
strict_objects: true
response_validation: eager
naming:
  strategy: use_route_based
  aliases:
    listPets: pets
base_url: https://api.example.com
"#;
        let config: GenerationConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.input, "spec.yaml");
        assert!(config.client);
        assert!(config.server);
        assert!(config.strict_objects);
        assert_eq!(config.response_validation, ResponseValidation::Eager);
        assert_eq!(config.naming.strategy, NamingStrategy::UseRouteBased);
        assert_eq!(config.naming.aliases["listPets"], "pets");
        assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let config: GenerationConfig = serde_yaml_ng::from_str(default_config_content()).unwrap();
        assert_eq!(config, GenerationConfig::default());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = std::env::temp_dir().join("ozc-config-test-missing");
        assert!(load_config(&dir.join(CONFIG_FILE_NAME)).unwrap().is_none());
    }
}
