//! The single renaming pass: raw names → final, collision-free identifiers.

use std::collections::{HashMap, HashSet};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::ir::SchemaNode;
use crate::naming::{type_name, unique_name};

/// Assign final names to `(key, raw name)` pairs, in order. Names are
/// PascalCased, then suffixed with `2`, `3`, ... when they clash with a
/// reserved identifier or an earlier type.
pub fn assign_names<'a>(
    types: impl IntoIterator<Item = (&'a str, &'a str)>,
    diagnostics: &mut Diagnostics,
) -> HashMap<String, String> {
    let mut taken = HashSet::new();
    let mut names = HashMap::new();
    for (key, raw) in types {
        let candidate = type_name(raw);
        let name = unique_name(&candidate, &taken);
        if name != candidate {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::IdentifierCollision,
                raw,
                format!("`{candidate}` is already in use, emitted as `{name}`"),
            ));
        }
        taken.insert(name.clone());
        names.insert(key.to_string(), name);
    }
    names
}

/// Point every reference in `node` at its final name. Returns the first
/// reference that has no final name.
pub fn rewrite_references(node: &mut SchemaNode, names: &HashMap<String, String>) -> Result<(), String> {
    let mut missing = None;
    node.for_each_reference_mut(&mut |r| match names.get(&r.target) {
        Some(name) => r.target = name.clone(),
        None => {
            missing.get_or_insert_with(|| r.target.clone());
        }
    });
    node.for_each_discriminator_mut(&mut |d, _| {
        for target in d.mapping.values_mut() {
            if let Some(name) = names.get(target.as_str()) {
                *target = name.clone();
            }
        }
    });
    match missing {
        Some(target) => Err(target),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collisions_are_suffixed_in_order() {
        let mut diagnostics = Diagnostics::new();
        let names = assign_names(
            [
                ("k1", "pet"),
                ("k2", "Pet"),
                ("k3", "Error"),
                ("k4", "pet-"),
            ],
            &mut diagnostics,
        );
        assert_eq!(names["k1"], "Pet");
        assert_eq!(names["k2"], "Pet2");
        assert_eq!(names["k3"], "Error2");
        assert_eq!(names["k4"], "Pet3");
        assert_eq!(diagnostics.of_kind(DiagnosticKind::IdentifierCollision).count(), 3);
    }

    #[test]
    fn test_rewrite_references() {
        let names = HashMap::from([("key#/A".to_string(), "A".to_string())]);
        let mut node = SchemaNode::reference("key#/A");
        rewrite_references(&mut node, &names).unwrap();
        assert_eq!(node, SchemaNode::reference("A"));

        let mut dangling = SchemaNode::reference("key#/B");
        assert_eq!(rewrite_references(&mut dangling, &names), Err("key#/B".to_string()));
    }
}
