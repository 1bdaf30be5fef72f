//! Branch-tag inference for discriminated unions.

use serde_json::Value;

use crate::ir::{CompositionKind, Discriminator, SchemaNode};

/// How deep to follow references and `allOf` chains looking for a tag.
const MAX_DEPTH: usize = 8;

/// Read access to registered types by registry key.
pub trait TypeLookup {
    fn node(&self, key: &str) -> Option<&SchemaNode>;
    /// Name the type was registered under, before renaming.
    fn raw_name(&self, key: &str) -> Option<&str>;
}

/// Fill in the branch table of every discriminator in `node`. Returns one
/// message per union whose tags could not be inferred; those unions keep an
/// empty table and compile untagged.
pub fn infer_all(node: &mut SchemaNode, types: &dyn TypeLookup) -> Vec<String> {
    let mut problems = Vec::new();
    node.for_each_discriminator_mut(&mut |discriminator, members| {
        if let Err(problem) = infer(discriminator, members, types) {
            problems.push(problem);
        }
    });
    problems
}

/// Tags come from, in order: the explicit mapping, a single literal value
/// of the discriminator property on the branch, or the branch's type name.
pub fn infer(
    discriminator: &mut Discriminator,
    members: &[SchemaNode],
    types: &dyn TypeLookup,
) -> Result<(), String> {
    let property = discriminator.property_name.as_str();
    let mut branches: Vec<(String, usize)> = Vec::new();

    for (index, member) in members.iter().enumerate() {
        let target = match member {
            SchemaNode::Reference(r) => Some(r.target.as_str()),
            _ => None,
        };

        let mut tags: Vec<String> = discriminator
            .mapping
            .iter()
            .filter(|(_, mapped)| Some(mapped.as_str()) == target)
            .map(|(tag, _)| tag.clone())
            .collect();
        if tags.is_empty()
            && let Some(tag) = literal_tag(member, property, types, 0)
        {
            tags.push(tag);
        }
        if tags.is_empty()
            && let Some(name) = target.and_then(|t| types.raw_name(t))
        {
            tags.push(name.to_string());
        }
        if tags.is_empty() {
            return Err(format!(
                "branch {} of the union has no value for `{property}`",
                index + 1
            ));
        }

        for tag in tags {
            if let Some((_, other)) = branches.iter().find(|(t, _)| *t == tag) {
                if *other != index {
                    return Err(format!(
                        "tag `{tag}` selects both branch {} and branch {}",
                        other + 1,
                        index + 1
                    ));
                }
                continue;
            }
            branches.push((tag, index));
        }
    }

    discriminator.branches = branches;
    Ok(())
}

/// A discriminator property pinned to exactly one string value.
fn literal_tag(
    node: &SchemaNode,
    property: &str,
    types: &dyn TypeLookup,
    depth: usize,
) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    match node {
        SchemaNode::Reference(r) => literal_tag(types.node(&r.target)?, property, types, depth + 1),
        SchemaNode::Object(obj) => match obj.properties.get(property)? {
            SchemaNode::Enum(e) if !e.is_extensible => match e.values.as_slice() {
                [Value::String(tag)] => Some(tag.clone()),
                _ => None,
            },
            _ => None,
        },
        SchemaNode::Composition(c) if c.kind == CompositionKind::AllOf => c
            .members
            .iter()
            .find_map(|m| literal_tag(m, property, types, depth + 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use indexmap::{IndexMap, IndexSet};
    use serde_json::json;

    use super::*;
    use crate::ir::{EnumNode, ObjectNode};

    #[derive(Default)]
    struct Types {
        nodes: HashMap<String, SchemaNode>,
    }

    impl TypeLookup for Types {
        fn node(&self, key: &str) -> Option<&SchemaNode> {
            self.nodes.get(key)
        }
        fn raw_name(&self, key: &str) -> Option<&str> {
            self.nodes.get_key_value(key).map(|(k, _)| k.as_str())
        }
    }

    fn tagged(tag: Option<&str>) -> SchemaNode {
        let mut properties = IndexMap::new();
        if let Some(tag) = tag {
            properties.insert(
                "kind".to_string(),
                SchemaNode::Enum(EnumNode {
                    values: vec![json!(tag)],
                    is_extensible: false,
                    default: None,
                }),
            );
        }
        SchemaNode::Object(ObjectNode {
            properties,
            required: IndexSet::new(),
            additional: None,
            default: None,
        })
    }

    fn discriminator(mapping: &[(&str, &str)]) -> Discriminator {
        Discriminator {
            property_name: "kind".to_string(),
            mapping: mapping
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            branches: Vec::new(),
        }
    }

    #[test]
    fn test_mapping_then_literal_then_name() {
        let mut types = Types::default();
        types.nodes.insert("Dog".to_string(), tagged(None));
        types.nodes.insert("Cat".to_string(), tagged(Some("cat")));
        types.nodes.insert("Bird".to_string(), tagged(None));
        let members = vec![
            SchemaNode::reference("Dog"),
            SchemaNode::reference("Cat"),
            SchemaNode::reference("Bird"),
        ];
        let mut d = discriminator(&[("doggo", "Dog")]);
        infer(&mut d, &members, &types).unwrap();
        assert_eq!(
            d.branches,
            vec![
                ("doggo".to_string(), 0),
                ("cat".to_string(), 1),
                ("Bird".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_inline_member_without_tag_fails() {
        let types = Types::default();
        let members = vec![tagged(Some("a")), tagged(None)];
        let mut d = discriminator(&[]);
        assert!(infer(&mut d, &members, &types).is_err());
        assert!(d.branches.is_empty());
    }

    #[test]
    fn test_duplicate_tag_fails() {
        let types = Types::default();
        let members = vec![tagged(Some("a")), tagged(Some("a"))];
        let mut d = discriminator(&[]);
        let err = infer(&mut d, &members, &types).unwrap_err();
        assert!(err.contains("`a`"));
    }
}
