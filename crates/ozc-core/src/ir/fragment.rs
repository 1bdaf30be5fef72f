use std::collections::BTreeSet;

/// Runtime helpers a fragment may call. They live in the shared support
/// unit; each generated unit imports only the ones its fragments use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Helper {
    TaggedUnion,
    ExclusiveUnion,
    BooleanParam,
    ArrayParam,
}

impl Helper {
    pub fn as_str(&self) -> &'static str {
        match self {
            Helper::TaggedUnion => "taggedUnion",
            Helper::ExclusiveUnion => "exclusiveUnion",
            Helper::BooleanParam => "booleanParam",
            Helper::ArrayParam => "arrayParam",
        }
    }

    pub const ALL: [Helper; 4] = [
        Helper::TaggedUnion,
        Helper::ExclusiveUnion,
        Helper::BooleanParam,
        Helper::ArrayParam,
    ];
}

/// A complete expression plus the named types and helpers it needs.
///
/// Fragments are values: composing two of them produces a new fragment
/// whose dependency set is the union of both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeFragment {
    pub code: String,
    pub dependencies: BTreeSet<String>,
    pub helpers: BTreeSet<Helper>,
}

impl CodeFragment {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into());
        self
    }

    pub fn with_helper(mut self, helper: Helper) -> Self {
        self.helpers.insert(helper);
        self
    }

    /// Rewrite the code, keeping dependencies.
    pub fn map(self, f: impl FnOnce(String) -> String) -> Self {
        Self {
            code: f(self.code),
            ..self
        }
    }

    /// Build a fragment from children: `render` receives their code in
    /// order; dependencies and helpers are the union of theirs.
    pub fn combine(parts: Vec<CodeFragment>, render: impl FnOnce(Vec<String>) -> String) -> Self {
        let mut dependencies = BTreeSet::new();
        let mut helpers = BTreeSet::new();
        let mut codes = Vec::with_capacity(parts.len());
        for part in parts {
            dependencies.extend(part.dependencies);
            helpers.extend(part.helpers);
            codes.push(part.code);
        }
        Self {
            code: render(codes),
            dependencies,
            helpers,
        }
    }

    /// Merge another fragment's requirements into this one without touching
    /// the code.
    pub fn absorb(&mut self, other: &CodeFragment) {
        self.dependencies.extend(other.dependencies.iter().cloned());
        self.helpers.extend(other.helpers.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_unions_dependencies() {
        let a = CodeFragment::new("A").with_dependency("A");
        let b = CodeFragment::new("B")
            .with_dependency("B")
            .with_helper(Helper::TaggedUnion);
        let joined = CodeFragment::combine(vec![a, b], |codes| codes.join(".and("));
        assert_eq!(joined.code, "A.and(B");
        assert_eq!(joined.dependencies.len(), 2);
        assert!(joined.helpers.contains(&Helper::TaggedUnion));
    }

    #[test]
    fn test_map_keeps_dependencies() {
        let frag = CodeFragment::new("Pet")
            .with_dependency("Pet")
            .map(|c| format!("{c}.nullable()"));
        assert_eq!(frag.code, "Pet.nullable()");
        assert!(frag.dependencies.contains("Pet"));
    }
}
