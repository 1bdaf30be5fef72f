use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

/// A resolved schema, lowered from the document tree.
///
/// References carry registry keys while the resolver is running and final
/// type names afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(PrimitiveNode),
    Null,
    Array(ArrayNode),
    Object(ObjectNode),
    Composition(CompositionNode),
    Reference(ReferenceNode),
    Enum(EnumNode),
    /// `type: [A, B, ...]` with one member per listed type, in document order.
    TypeArray(Vec<SchemaNode>),
    /// Matches any value (empty schema, `true`, unknown shape).
    Any,
    /// Matches nothing (`false`, `not: {}`).
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Boolean => "boolean",
        }
    }
}

/// String and numeric constraints. Integers and numbers share the numeric
/// fields; strings use the length fields and `pattern`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveNode {
    pub kind: PrimitiveKind,
    pub format: Option<String>,
    pub constraints: Constraints,
    pub default: Option<Value>,
}

impl PrimitiveNode {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            format: None,
            constraints: Constraints::default(),
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub items: Box<SchemaNode>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub default: Option<Value>,
}

/// What an object does with keys it does not declare.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalPolicy {
    Closed,
    Open,
    Typed(Box<SchemaNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: IndexSet<String>,
    /// `None` when the document says nothing; strict mode closes such
    /// objects, otherwise they are open.
    pub additional: Option<AdditionalPolicy>,
    pub default: Option<Value>,
}

impl ObjectNode {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    AllOf,
    AnyOf,
    OneOf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionNode {
    pub kind: CompositionKind,
    pub members: Vec<SchemaNode>,
    pub discriminator: Option<Discriminator>,
}

/// A discriminator as declared, plus the branch table inferred for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub property_name: String,
    /// Explicit `mapping`: tag → reference target.
    pub mapping: IndexMap<String, String>,
    /// Inferred tag → member index. Empty until inference succeeds; an empty
    /// table means the union is compiled untagged.
    pub branches: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceNode {
    pub target: String,
    /// The edge is part of a reference cycle and must be evaluated lazily.
    pub deferred: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumNode {
    pub values: Vec<Value>,
    /// `x-extensible-enum`: the values are documentation, any string passes.
    pub is_extensible: bool,
    pub default: Option<Value>,
}

impl SchemaNode {
    pub fn reference(target: impl Into<String>) -> Self {
        SchemaNode::Reference(ReferenceNode {
            target: target.into(),
            deferred: false,
        })
    }

    /// `[T, null]` in either order: the non-null member.
    pub fn nullable_inner(&self) -> Option<&SchemaNode> {
        match self {
            SchemaNode::TypeArray(members) if members.len() == 2 => {
                match (&members[0], &members[1]) {
                    (inner, SchemaNode::Null) | (SchemaNode::Null, inner) => Some(inner),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Visit every reference in this node, outermost first.
    pub fn for_each_reference(&self, f: &mut dyn FnMut(&ReferenceNode)) {
        match self {
            SchemaNode::Reference(r) => f(r),
            SchemaNode::Array(a) => a.items.for_each_reference(f),
            SchemaNode::Object(o) => {
                for prop in o.properties.values() {
                    prop.for_each_reference(f);
                }
                if let Some(AdditionalPolicy::Typed(extra)) = &o.additional {
                    extra.for_each_reference(f);
                }
            }
            SchemaNode::Composition(c) => {
                for member in &c.members {
                    member.for_each_reference(f);
                }
            }
            SchemaNode::TypeArray(members) => {
                for member in members {
                    member.for_each_reference(f);
                }
            }
            SchemaNode::Primitive(_)
            | SchemaNode::Null
            | SchemaNode::Enum(_)
            | SchemaNode::Any
            | SchemaNode::Never => {}
        }
    }

    pub fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut ReferenceNode)) {
        match self {
            SchemaNode::Reference(r) => f(r),
            SchemaNode::Array(a) => a.items.for_each_reference_mut(f),
            SchemaNode::Object(o) => {
                for prop in o.properties.values_mut() {
                    prop.for_each_reference_mut(f);
                }
                if let Some(AdditionalPolicy::Typed(extra)) = &mut o.additional {
                    extra.for_each_reference_mut(f);
                }
            }
            SchemaNode::Composition(c) => {
                for member in &mut c.members {
                    member.for_each_reference_mut(f);
                }
            }
            SchemaNode::TypeArray(members) => {
                for member in members {
                    member.for_each_reference_mut(f);
                }
            }
            SchemaNode::Primitive(_)
            | SchemaNode::Null
            | SchemaNode::Enum(_)
            | SchemaNode::Any
            | SchemaNode::Never => {}
        }
    }

    /// Visit every discriminator in this node, mutably.
    pub fn for_each_discriminator_mut(
        &mut self,
        f: &mut dyn FnMut(&mut Discriminator, &[SchemaNode]),
    ) {
        match self {
            SchemaNode::Composition(c) => {
                for member in &mut c.members {
                    member.for_each_discriminator_mut(f);
                }
                if let Some(d) = &mut c.discriminator {
                    f(d, &c.members);
                }
            }
            SchemaNode::Array(a) => a.items.for_each_discriminator_mut(f),
            SchemaNode::Object(o) => {
                for prop in o.properties.values_mut() {
                    prop.for_each_discriminator_mut(f);
                }
                if let Some(AdditionalPolicy::Typed(extra)) = &mut o.additional {
                    extra.for_each_discriminator_mut(f);
                }
            }
            SchemaNode::TypeArray(members) => {
                for member in members {
                    member.for_each_discriminator_mut(f);
                }
            }
            _ => {}
        }
    }

    /// Names of all referenced types, in first-seen order.
    pub fn references(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        self.for_each_reference(&mut |r| {
            out.insert(r.target.clone());
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string() -> SchemaNode {
        SchemaNode::Primitive(PrimitiveNode::new(PrimitiveKind::String))
    }

    #[test]
    fn test_nullable_inner_either_order() {
        let a = SchemaNode::TypeArray(vec![string(), SchemaNode::Null]);
        let b = SchemaNode::TypeArray(vec![SchemaNode::Null, string()]);
        assert_eq!(a.nullable_inner(), Some(&string()));
        assert_eq!(b.nullable_inner(), Some(&string()));
        let c = SchemaNode::TypeArray(vec![string(), SchemaNode::Null, SchemaNode::Any]);
        assert_eq!(c.nullable_inner(), None);
    }

    #[test]
    fn test_references_are_collected_once() {
        let node = SchemaNode::Object(ObjectNode {
            properties: IndexMap::from([
                ("a".to_string(), SchemaNode::reference("Pet")),
                (
                    "b".to_string(),
                    SchemaNode::Array(ArrayNode {
                        items: Box::new(SchemaNode::reference("Pet")),
                        min_items: None,
                        max_items: None,
                        unique_items: false,
                        default: None,
                    }),
                ),
                ("c".to_string(), SchemaNode::reference("Owner")),
            ]),
            required: IndexSet::new(),
            additional: None,
            default: None,
        });
        let refs: Vec<String> = node.references().into_iter().collect();
        assert_eq!(refs, ["Pet", "Owner"]);
    }
}
