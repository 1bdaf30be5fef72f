//! `$ref` strings, registry keys, and JSON pointer lookup.

use serde_json::Value;

use crate::error::ResolveError;
use crate::load::Location;

const COMPONENT_SCHEMAS: &str = "/components/schemas/";

/// Where a `$ref` points: an absolute document location plus a decoded
/// JSON pointer (empty for the whole document).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefTarget {
    pub location: Location,
    pub pointer: String,
}

impl RefTarget {
    /// Resolve `reference` against the document it appears in.
    pub fn parse(base: &Location, reference: &str) -> Result<Self, ResolveError> {
        let (document, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        let pointer = percent_decode(fragment);
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(ResolveError::InvalidRefFormat(reference.to_string()));
        }
        let location = base
            .join(document)
            .map_err(|_| ResolveError::InvalidRefFormat(reference.to_string()))?;
        Ok(Self { location, pointer })
    }

    /// Canonical registry key, `location#pointer`.
    pub fn key(&self) -> String {
        format!("{}#{}", self.location, self.pointer)
    }

    /// The name a type found here is registered under before renaming:
    /// the component name for `#/components/schemas/X`, else the last
    /// pointer segment, else the file stem.
    pub fn raw_name(&self) -> String {
        if let Some(name) = self.pointer.strip_prefix(COMPONENT_SCHEMAS)
            && !name.contains('/')
        {
            return unescape(name);
        }
        match self.pointer.rsplit('/').next().filter(|s| !s.is_empty()) {
            Some(segment) => unescape(segment),
            None => self.location.file_stem().unwrap_or("Schema").to_string(),
        }
    }

    /// The component name when this is `<root>#/components/schemas/X`.
    pub fn component_name(&self, root: &Location) -> Option<String> {
        if &self.location != root {
            return None;
        }
        let name = self.pointer.strip_prefix(COMPONENT_SCHEMAS)?;
        (!name.contains('/')).then(|| unescape(name))
    }
}

/// The target of a schema under the root document's `components.schemas`.
pub fn component_target(root: &Location, name: &str) -> RefTarget {
    RefTarget {
        location: root.clone(),
        pointer: format!("{COMPONENT_SCHEMAS}{}", escape(name)),
    }
}

/// Look up a pointer. Unconverted Swagger fragments keep their schemas under
/// `definitions`, so `/components/schemas/X` falls back there.
pub fn lookup<'a>(document: &'a Value, pointer: &str) -> Option<&'a Value> {
    document.pointer(pointer).or_else(|| {
        let name = pointer.strip_prefix(COMPONENT_SCHEMAS)?;
        document.pointer(&format!("/definitions/{name}"))
    })
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Decode `%XX` escapes in a URI fragment. Malformed escapes are kept as-is.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let Some(byte) = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn root() -> Location {
        Location::parse("file:///api/openapi.yaml").unwrap()
    }

    #[test]
    fn test_local_ref() {
        let target = RefTarget::parse(&root(), "#/components/schemas/Pet").unwrap();
        assert_eq!(target.location, root());
        assert_eq!(target.pointer, "/components/schemas/Pet");
        assert_eq!(target.key(), "file:///api/openapi.yaml#/components/schemas/Pet");
        assert_eq!(target.raw_name(), "Pet");
        assert_eq!(target.component_name(&root()).as_deref(), Some("Pet"));
    }

    #[test]
    fn test_external_ref() {
        let target = RefTarget::parse(&root(), "common/pet.yaml#/Pet").unwrap();
        assert_eq!(target.location.to_string(), "file:///api/common/pet.yaml");
        assert_eq!(target.raw_name(), "Pet");
        assert_eq!(target.component_name(&root()), None);

        let whole = RefTarget::parse(&root(), "./error.json").unwrap();
        assert_eq!(whole.pointer, "");
        assert_eq!(whole.raw_name(), "error");
    }

    #[test]
    fn test_escaped_segments() {
        let target = RefTarget::parse(&root(), "#/paths/~1pets/get/responses/200/content/application~1json/schema").unwrap();
        assert_eq!(target.raw_name(), "schema");
        let encoded = RefTarget::parse(&root(), "#/components/schemas/Pet%20Food").unwrap();
        assert_eq!(encoded.raw_name(), "Pet Food");
    }

    #[test]
    fn test_anchor_refs_are_rejected() {
        assert_eq!(
            RefTarget::parse(&root(), "#pet"),
            Err(ResolveError::InvalidRefFormat("#pet".to_string()))
        );
    }

    #[test]
    fn test_lookup_falls_back_to_definitions() {
        let doc = json!({ "definitions": { "Pet": { "type": "object" } } });
        assert_eq!(lookup(&doc, "/components/schemas/Pet"), Some(&json!({ "type": "object" })));
        assert_eq!(lookup(&doc, "/components/schemas/Cat"), None);
        let target = component_target(&root(), "a/b");
        assert_eq!(target.key(), "file:///api/openapi.yaml#/components/schemas/a~1b");
        assert_eq!(target.raw_name(), "a/b");
    }
}
