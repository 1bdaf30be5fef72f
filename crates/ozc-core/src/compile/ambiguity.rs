//! Overlap checks for unions that are matched by trial parsing.
//!
//! A discriminated union never overlaps: the tag picks the branch. An
//! untagged `anyOf` or type array reports the first member that parses,
//! so two members that can accept the same input make the result depend
//! on member order.

use indexmap::IndexSet;

use crate::ir::{CompositionKind, PrimitiveKind, SchemaNode, TypeRegistry};

/// Alias chains longer than this are not followed.
const MAX_DEPTH: usize = 8;

/// Describe every overlapping member pair in the untagged unions of `node`.
pub fn ambiguities(node: &SchemaNode, registry: &TypeRegistry) -> Vec<String> {
    let mut found = Vec::new();
    visit(node, registry, &mut found);
    found
}

fn visit(node: &SchemaNode, registry: &TypeRegistry, found: &mut Vec<String>) {
    match node {
        SchemaNode::Composition(c) => {
            let tagged = c.discriminator.as_ref().is_some_and(|d| !d.branches.is_empty());
            if c.kind == CompositionKind::AnyOf && !tagged {
                check_members("anyOf", &c.members, registry, found);
            }
            for member in &c.members {
                visit(member, registry, found);
            }
        }
        SchemaNode::TypeArray(members) => {
            if node.nullable_inner().is_none() {
                check_members("type array", members, registry, found);
            }
            for member in members {
                visit(member, registry, found);
            }
        }
        SchemaNode::Array(a) => visit(&a.items, registry, found),
        SchemaNode::Object(o) => {
            for prop in o.properties.values() {
                visit(prop, registry, found);
            }
        }
        _ => {}
    }
}

fn check_members(
    what: &str,
    members: &[SchemaNode],
    registry: &TypeRegistry,
    found: &mut Vec<String>,
) {
    let shapes: Vec<Shape> = members.iter().map(|m| Shape::of(m, registry, 0)).collect();
    for (i, a) in shapes.iter().enumerate() {
        for (j, b) in shapes.iter().enumerate().skip(i + 1) {
            if let Some(reason) = a.overlap(b) {
                found.push(format!(
                    "{what} members {} and {} may both match: {reason}; the first one listed wins",
                    i + 1,
                    j + 1
                ));
            }
        }
    }
}

/// The part of a member that decides whether it can overlap another.
enum Shape {
    Any,
    Scalar(PrimitiveKind),
    Object {
        required: IndexSet<String>,
        declared: IndexSet<String>,
    },
    Other,
}

impl Shape {
    fn of(node: &SchemaNode, registry: &TypeRegistry, depth: usize) -> Self {
        match node {
            SchemaNode::Any => Shape::Any,
            SchemaNode::Primitive(p) => Shape::Scalar(p.kind),
            SchemaNode::Object(o) => Shape::Object {
                required: o.required.clone(),
                declared: o.properties.keys().cloned().collect(),
            },
            SchemaNode::Reference(r) if depth < MAX_DEPTH => match registry.get(&r.target) {
                Some(named) => Shape::of(&named.node, registry, depth + 1),
                None => Shape::Other,
            },
            _ => Shape::Other,
        }
    }

    fn overlap(&self, other: &Shape) -> Option<String> {
        match (self, other) {
            (Shape::Any, _) | (_, Shape::Any) => Some("one of them accepts any value".to_string()),
            (Shape::Scalar(a), Shape::Scalar(b)) => {
                let numeric = |k: &PrimitiveKind| {
                    matches!(k, PrimitiveKind::Number | PrimitiveKind::Integer)
                };
                if a == b || (numeric(a) && numeric(b)) {
                    Some(format!("both accept {}", a.as_str()))
                } else {
                    None
                }
            }
            (
                Shape::Object {
                    required: ra,
                    declared: da,
                },
                Shape::Object {
                    required: rb,
                    declared: db,
                },
            ) => {
                if ra.is_subset(db) || rb.is_subset(da) {
                    Some("an object with the keys of one also satisfies the other".to_string())
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
