//! `SchemaNode` → TypeScript type expression. Used for named types that
//! take part in a reference cycle, whose validator type cannot be inferred.

use serde_json::Value;

use super::literal;
use crate::ir::{AdditionalPolicy, CodeFragment, CompositionKind, PrimitiveKind, SchemaNode};

/// Print the output type a node's validator produces.
pub fn type_expr(node: &SchemaNode) -> CodeFragment {
    print(node).0
}

/// Binding strength of a printed type, to decide where parentheses go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Union,
    Intersection,
    Atom,
}

fn print(node: &SchemaNode) -> (CodeFragment, Precedence) {
    match node {
        SchemaNode::Primitive(p) => {
            let ty = match p.kind {
                PrimitiveKind::String if p.format.as_deref() == Some("binary") => "Blob",
                PrimitiveKind::String => "string",
                PrimitiveKind::Number | PrimitiveKind::Integer => "number",
                PrimitiveKind::Boolean => "boolean",
            };
            atom(ty)
        }
        SchemaNode::Null => atom("null"),
        SchemaNode::Any => atom("unknown"),
        SchemaNode::Never => atom("never"),
        SchemaNode::Reference(r) => (
            CodeFragment::new(r.target.clone()).with_dependency(r.target.clone()),
            Precedence::Atom,
        ),
        SchemaNode::Array(a) => {
            let (items, _) = print(&a.items);
            (items.map(|code| format!("Array<{code}>")), Precedence::Atom)
        }
        SchemaNode::Object(o) => {
            let mut keys = Vec::new();
            let mut parts = Vec::new();
            for (name, prop) in &o.properties {
                let optional = if o.is_required(name) { "" } else { "?" };
                keys.push(format!("{}{optional}", literal::property_key(name)));
                parts.push(print(prop).0);
            }
            let extra = match &o.additional {
                Some(AdditionalPolicy::Typed(extra)) => Some(print(extra).0),
                _ => None,
            };
            let has_extra = extra.is_some();
            parts.extend(extra);
            let frag = CodeFragment::combine(parts, |mut codes| {
                let extra = if has_extra { codes.pop() } else { None };
                if keys.is_empty() {
                    return match extra {
                        Some(extra) => format!("Record<string, {extra}>"),
                        None => "Record<string, unknown>".to_string(),
                    };
                }
                let mut fields: Vec<String> = keys
                    .iter()
                    .zip(&codes)
                    .map(|(key, code)| format!("{key}: {code}"))
                    .collect();
                if extra.is_some() {
                    fields.push("[key: string]: unknown".to_string());
                }
                format!("{{ {} }}", fields.join("; "))
            });
            (frag, Precedence::Atom)
        }
        SchemaNode::Composition(c) => {
            let (separator, precedence) = match c.kind {
                CompositionKind::AllOf => (" & ", Precedence::Intersection),
                CompositionKind::AnyOf | CompositionKind::OneOf => (" | ", Precedence::Union),
            };
            join(&c.members, separator, precedence)
        }
        SchemaNode::TypeArray(members) => join(members, " | ", Precedence::Union),
        SchemaNode::Enum(e) => {
            if e.is_extensible {
                let known: Vec<String> = e.values.iter().map(literal::json).collect();
                let mut members = known;
                members.push("(string & {})".to_string());
                return (CodeFragment::new(members.join(" | ")), Precedence::Union);
            }
            let literals: Vec<String> = e.values.iter().map(enum_literal).collect();
            match literals.len() {
                0 => atom("never"),
                1 => (CodeFragment::new(literals.join("")), Precedence::Atom),
                _ => (CodeFragment::new(literals.join(" | ")), Precedence::Union),
            }
        }
    }
}

fn atom(ty: &str) -> (CodeFragment, Precedence) {
    (CodeFragment::new(ty), Precedence::Atom)
}

fn enum_literal(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => "unknown".to_string(),
        other => literal::json(other),
    }
}

fn join(members: &[SchemaNode], separator: &str, precedence: Precedence) -> (CodeFragment, Precedence) {
    match members {
        [] => atom("unknown"),
        [single] => print(single),
        _ => {
            let parts: Vec<CodeFragment> = members
                .iter()
                .map(|m| {
                    let (frag, inner) = print(m);
                    if inner < precedence {
                        frag.map(|code| format!("({code})"))
                    } else {
                        frag
                    }
                })
                .collect();
            (
                CodeFragment::combine(parts, |codes| codes.join(separator)),
                precedence,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::{IndexMap, IndexSet};

    use super::*;
    use crate::ir::{ArrayNode, CompositionNode, ObjectNode, PrimitiveNode};

    fn prim(kind: PrimitiveKind) -> SchemaNode {
        SchemaNode::Primitive(PrimitiveNode::new(kind))
    }

    #[test]
    fn test_self_referencing_tree() {
        let node = SchemaNode::Object(ObjectNode {
            properties: IndexMap::from([
                ("value".to_string(), prim(PrimitiveKind::Integer)),
                (
                    "children".to_string(),
                    SchemaNode::Array(ArrayNode {
                        items: Box::new(SchemaNode::reference("Tree")),
                        min_items: None,
                        max_items: None,
                        unique_items: false,
                        default: None,
                    }),
                ),
            ]),
            required: IndexSet::from(["value".to_string()]),
            additional: None,
            default: None,
        });
        let frag = type_expr(&node);
        assert_eq!(frag.code, "{ value: number; children?: Array<Tree> }");
        assert!(frag.dependencies.contains("Tree"));
    }

    #[test]
    fn test_parenthesized_unions_in_intersections() {
        let node = SchemaNode::Composition(CompositionNode {
            kind: CompositionKind::AllOf,
            members: vec![
                SchemaNode::reference("Base"),
                SchemaNode::TypeArray(vec![prim(PrimitiveKind::String), SchemaNode::Null]),
            ],
            discriminator: None,
        });
        assert_eq!(type_expr(&node).code, "Base & (string | null)");
    }

    #[test]
    fn test_record_for_typed_additional_properties() {
        let node = SchemaNode::Object(ObjectNode {
            properties: IndexMap::new(),
            required: IndexSet::new(),
            additional: Some(AdditionalPolicy::Typed(Box::new(prim(PrimitiveKind::Boolean)))),
            default: None,
        });
        assert_eq!(type_expr(&node).code, "Record<string, boolean>");
    }
}
