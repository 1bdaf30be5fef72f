use indexmap::IndexMap;

use super::schema::SchemaNode;

/// A schema registered under a stable name and emitted as its own unit.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: String,
    /// Canonical `location#pointer` the type was found at.
    pub key: String,
    pub description: Option<String>,
    pub node: SchemaNode,
    /// Part of a reference cycle (including a self-reference).
    pub cyclic: bool,
}

/// All named types after resolution, in registration order and keyed by
/// final name. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, NamedType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a type. Names must already be unique.
    pub fn insert(&mut self, named: NamedType) {
        self.types.insert(named.name.clone(), named);
    }

    pub fn get(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
