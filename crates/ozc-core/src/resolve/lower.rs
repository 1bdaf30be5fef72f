//! Typed schema → `SchemaNode`.

use indexmap::{IndexMap, IndexSet};

use super::pointer::RefTarget;
use crate::error::ResolveError;
use crate::ir::{
    AdditionalPolicy, ArrayNode, CompositionKind, CompositionNode, Constraints, Discriminator,
    EnumNode, ObjectNode, PrimitiveKind, PrimitiveNode, SchemaNode,
};
use crate::load::Location;
use crate::parse::schema::{self, AdditionalProperties, Schema, SchemaOrRef, SchemaType};

/// A lowered schema and the reference targets it mentions.
#[derive(Debug)]
pub struct Lowered {
    pub node: SchemaNode,
    /// Keyed by registry key, in first-seen order.
    pub targets: IndexMap<String, RefTarget>,
    /// Keywords that were dropped while lowering.
    pub ignored: Vec<String>,
}

/// Lower a schema found in the document at `base`. References become
/// [`SchemaNode::Reference`] nodes holding registry keys.
pub fn lower(schema: &SchemaOrRef, base: &Location) -> Result<Lowered, ResolveError> {
    let mut lowerer = Lowerer {
        base,
        targets: IndexMap::new(),
        ignored: Vec::new(),
    };
    let node = lowerer.lower(schema)?;
    Ok(Lowered {
        node,
        targets: lowerer.targets,
        ignored: lowerer.ignored,
    })
}

struct Lowerer<'a> {
    base: &'a Location,
    targets: IndexMap<String, RefTarget>,
    ignored: Vec<String>,
}

impl Lowerer<'_> {
    fn lower(&mut self, schema: &SchemaOrRef) -> Result<SchemaNode, ResolveError> {
        match schema {
            SchemaOrRef::Ref { ref_path } => {
                let target = RefTarget::parse(self.base, ref_path)?;
                let key = target.key();
                self.targets.entry(key.clone()).or_insert(target);
                Ok(SchemaNode::reference(key))
            }
            SchemaOrRef::Bool(true) => Ok(SchemaNode::Any),
            SchemaOrRef::Bool(false) => Ok(SchemaNode::Never),
            SchemaOrRef::Schema(schema) => self.lower_schema(schema),
        }
    }

    fn lower_schema(&mut self, schema: &Schema) -> Result<SchemaNode, ResolveError> {
        if schema.not.as_deref().is_some_and(matches_anything) {
            return Ok(SchemaNode::Never);
        }

        let has_composition =
            !(schema.all_of.is_empty() && schema.any_of.is_empty() && schema.one_of.is_empty());
        if has_composition {
            return self.lower_composition(schema);
        }
        if let Some(d) = &schema.discriminator {
            self.ignore_discriminator(&d.property_name);
        }

        if !schema.extensible_enum.is_empty() {
            return Ok(SchemaNode::Enum(EnumNode {
                values: schema.extensible_enum.clone(),
                is_extensible: true,
                default: schema.default_value.clone(),
            }));
        }
        if !schema.enum_values.is_empty() || schema.const_value.is_some() {
            let values = match &schema.const_value {
                Some(value) => vec![value.clone()],
                None => schema.enum_values.clone(),
            };
            return Ok(SchemaNode::Enum(EnumNode {
                values,
                is_extensible: false,
                default: schema.default_value.clone(),
            }));
        }

        match &schema.schema_type {
            Some(types) => match types.as_slice() {
                [] => Ok(SchemaNode::Any),
                [single] => self.lower_typed(*single, schema),
                many => {
                    let mut seen = Vec::new();
                    let mut members = Vec::new();
                    for t in many {
                        if !seen.contains(t) {
                            seen.push(*t);
                            members.push(self.lower_typed(*t, schema)?);
                        }
                    }
                    Ok(SchemaNode::TypeArray(members))
                }
            },
            None if is_object_shaped(schema) => self.lower_typed(SchemaType::Object, schema),
            None if schema.items.is_some() => self.lower_typed(SchemaType::Array, schema),
            None => Ok(SchemaNode::Any),
        }
    }

    /// allOf/anyOf/oneOf, plus any structure declared beside them, which
    /// becomes an extra `allOf` member.
    fn lower_composition(&mut self, schema: &Schema) -> Result<SchemaNode, ResolveError> {
        let mut parts = Vec::new();

        let own = Schema {
            all_of: Vec::new(),
            any_of: Vec::new(),
            one_of: Vec::new(),
            discriminator: None,
            title: None,
            description: None,
            ..schema.clone()
        };
        let own = self.lower_schema(&own)?;
        if own != SchemaNode::Any {
            parts.push(own);
        }

        let discriminator = schema
            .discriminator
            .as_ref()
            .map(|d| self.lower_discriminator(d))
            .transpose()?;
        let tagged_kind = if !schema.one_of.is_empty() {
            Some(CompositionKind::OneOf)
        } else if !schema.any_of.is_empty() {
            Some(CompositionKind::AnyOf)
        } else {
            None
        };
        if let (Some(d), None) = (&discriminator, tagged_kind) {
            self.ignore_discriminator(&d.property_name);
        }

        let groups = [
            (CompositionKind::AllOf, &schema.all_of),
            (CompositionKind::AnyOf, &schema.any_of),
            (CompositionKind::OneOf, &schema.one_of),
        ];
        let mut all_of_members = Vec::new();
        for (kind, members) in groups {
            if members.is_empty() {
                continue;
            }
            let lowered = members
                .iter()
                .map(|m| self.lower(m))
                .collect::<Result<Vec<_>, _>>()?;
            if kind == CompositionKind::AllOf {
                all_of_members = lowered;
                continue;
            }
            parts.push(SchemaNode::Composition(CompositionNode {
                kind,
                members: lowered,
                discriminator: if Some(kind) == tagged_kind {
                    discriminator.clone()
                } else {
                    None
                },
            }));
        }

        all_of_members.extend(parts);
        if all_of_members.len() == 1 {
            return Ok(all_of_members.remove(0));
        }
        Ok(SchemaNode::Composition(CompositionNode {
            kind: CompositionKind::AllOf,
            members: all_of_members,
            discriminator: None,
        }))
    }

    fn ignore_discriminator(&mut self, property: &str) {
        self.ignored.push(format!(
            "discriminator `{property}` has no oneOf or anyOf to pick a branch from; ignored"
        ));
    }

    fn lower_discriminator(
        &mut self,
        discriminator: &schema::Discriminator,
    ) -> Result<Discriminator, ResolveError> {
        let mut mapping = IndexMap::new();
        for (tag, target) in &discriminator.mapping {
            // Bare names are shorthand for component schemas.
            let reference = if target.contains('#') || target.contains('/') || target.contains('.') {
                target.clone()
            } else {
                format!("#/components/schemas/{target}")
            };
            let key = RefTarget::parse(self.base, &reference)?.key();
            mapping.insert(tag.clone(), key);
        }
        Ok(Discriminator {
            property_name: discriminator.property_name.clone(),
            mapping,
            branches: Vec::new(),
        })
    }

    fn lower_typed(&mut self, t: SchemaType, schema: &Schema) -> Result<SchemaNode, ResolveError> {
        let node = match t {
            SchemaType::String => primitive(PrimitiveKind::String, schema),
            SchemaType::Number => primitive(PrimitiveKind::Number, schema),
            SchemaType::Integer => primitive(PrimitiveKind::Integer, schema),
            SchemaType::Boolean => primitive(PrimitiveKind::Boolean, schema),
            SchemaType::Null => SchemaNode::Null,
            SchemaType::Array => {
                let items = match &schema.items {
                    Some(items) => self.lower(items)?,
                    None => SchemaNode::Any,
                };
                SchemaNode::Array(ArrayNode {
                    items: Box::new(items),
                    min_items: schema.min_items,
                    max_items: schema.max_items,
                    unique_items: schema.unique_items.unwrap_or(false),
                    default: schema.default_value.clone(),
                })
            }
            SchemaType::Object => {
                let mut properties = IndexMap::new();
                for (name, prop) in &schema.properties {
                    properties.insert(name.clone(), self.lower(prop)?);
                }
                let additional = match &schema.additional_properties {
                    None => None,
                    Some(AdditionalProperties::Bool(true)) => Some(AdditionalPolicy::Open),
                    Some(AdditionalProperties::Bool(false)) => Some(AdditionalPolicy::Closed),
                    Some(AdditionalProperties::Schema(extra)) => match self.lower(extra)? {
                        SchemaNode::Any => Some(AdditionalPolicy::Open),
                        SchemaNode::Never => Some(AdditionalPolicy::Closed),
                        node => Some(AdditionalPolicy::Typed(Box::new(node))),
                    },
                };
                SchemaNode::Object(ObjectNode {
                    properties,
                    required: schema.required.iter().cloned().collect::<IndexSet<_>>(),
                    additional,
                    default: schema.default_value.clone(),
                })
            }
        };
        Ok(node)
    }
}

fn primitive(kind: PrimitiveKind, schema: &Schema) -> SchemaNode {
    SchemaNode::Primitive(PrimitiveNode {
        kind,
        format: schema.format.clone(),
        constraints: Constraints {
            min_length: schema.min_length,
            max_length: schema.max_length,
            pattern: schema.pattern.clone(),
            minimum: schema.minimum,
            maximum: schema.maximum,
            exclusive_minimum: schema.exclusive_minimum,
            exclusive_maximum: schema.exclusive_maximum,
            multiple_of: schema.multiple_of,
        },
        default: schema.default_value.clone(),
    })
}

fn is_object_shaped(schema: &Schema) -> bool {
    !schema.properties.is_empty()
        || schema.additional_properties.is_some()
        || !schema.required.is_empty()
}

fn matches_anything(schema: &SchemaOrRef) -> bool {
    match schema {
        SchemaOrRef::Bool(accepts) => *accepts,
        SchemaOrRef::Schema(inner) => **inner == Schema::default(),
        SchemaOrRef::Ref { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::parse::schema_from_value;

    fn base() -> Location {
        Location::parse("file:///api/openapi.yaml").unwrap()
    }

    fn lower_json(value: serde_json::Value) -> Lowered {
        lower(&schema_from_value(&value).unwrap(), &base()).unwrap()
    }

    #[test]
    fn test_nullable_type_array() {
        let node = lower_json(json!({ "type": ["string", "null"], "minLength": 1 })).node;
        let inner = node.nullable_inner().unwrap();
        let SchemaNode::Primitive(p) = inner else {
            panic!("expected primitive, got {inner:?}");
        };
        assert_eq!(p.kind, PrimitiveKind::String);
        assert_eq!(p.constraints.min_length, Some(1));
    }

    #[test]
    fn test_reference_becomes_key() {
        let lowered = lower_json(json!({
            "type": "object",
            "properties": { "owner": { "$ref": "#/components/schemas/Owner" } },
            "required": ["owner"]
        }));
        let key = "file:///api/openapi.yaml#/components/schemas/Owner";
        assert_eq!(lowered.targets.len(), 1);
        assert!(lowered.targets.contains_key(key));
        let SchemaNode::Object(obj) = lowered.node else {
            panic!("expected object");
        };
        assert_eq!(obj.properties["owner"], SchemaNode::reference(key));
        assert!(obj.is_required("owner"));
        assert_eq!(obj.additional, None);
    }

    #[test]
    fn test_additional_properties_policies() {
        let closed = lower_json(json!({ "type": "object", "additionalProperties": false })).node;
        let typed = lower_json(json!({ "type": "object", "additionalProperties": { "type": "integer" } })).node;
        let open = lower_json(json!({ "type": "object", "additionalProperties": {} })).node;
        assert!(matches!(closed, SchemaNode::Object(ObjectNode { additional: Some(AdditionalPolicy::Closed), .. })));
        assert!(matches!(typed, SchemaNode::Object(ObjectNode { additional: Some(AdditionalPolicy::Typed(_)), .. })));
        assert!(matches!(open, SchemaNode::Object(ObjectNode { additional: Some(AdditionalPolicy::Open), .. })));
    }

    #[test]
    fn test_enum_and_const() {
        let e = lower_json(json!({ "type": "string", "enum": ["a", "b"], "default": "a" })).node;
        assert_eq!(
            e,
            SchemaNode::Enum(EnumNode {
                values: vec![json!("a"), json!("b")],
                is_extensible: false,
                default: Some(json!("a")),
            })
        );
        let c = lower_json(json!({ "const": "dog" })).node;
        assert!(matches!(c, SchemaNode::Enum(EnumNode { ref values, .. }) if values == &vec![json!("dog")]));
        let x = lower_json(json!({ "type": "string", "x-extensible-enum": ["x"] })).node;
        assert!(matches!(x, SchemaNode::Enum(EnumNode { is_extensible: true, .. })));
    }

    #[test]
    fn test_one_of_with_discriminator_and_sibling_properties() {
        let node = lower_json(json!({
            "type": "object",
            "properties": { "id": { "type": "integer" } },
            "oneOf": [ { "$ref": "#/components/schemas/Dog" }, { "$ref": "#/components/schemas/Cat" } ],
            "discriminator": { "propertyName": "kind", "mapping": { "dog": "Dog" } }
        }))
        .node;
        let SchemaNode::Composition(all) = node else {
            panic!("expected composition");
        };
        assert_eq!(all.kind, CompositionKind::AllOf);
        assert!(matches!(all.members[0], SchemaNode::Object(_)));
        let SchemaNode::Composition(one) = &all.members[1] else {
            panic!("expected oneOf");
        };
        assert_eq!(one.kind, CompositionKind::OneOf);
        let d = one.discriminator.as_ref().unwrap();
        assert_eq!(d.property_name, "kind");
        assert_eq!(d.mapping["dog"], "file:///api/openapi.yaml#/components/schemas/Dog");
    }

    #[test]
    fn test_boolean_and_empty_schemas() {
        assert_eq!(lower_json(json!(true)).node, SchemaNode::Any);
        assert_eq!(lower_json(json!(false)).node, SchemaNode::Never);
        assert_eq!(lower_json(json!({})).node, SchemaNode::Any);
        assert_eq!(lower_json(json!({ "not": {} })).node, SchemaNode::Never);
    }

    #[test]
    fn test_untyped_shapes_are_inferred() {
        assert!(matches!(lower_json(json!({ "properties": {} , "required": ["a"] })).node, SchemaNode::Object(_)));
        assert!(matches!(lower_json(json!({ "items": { "type": "string" } })).node, SchemaNode::Array(_)));
    }

    #[test]
    fn test_discriminator_without_union_is_reported() {
        let base = lower_json(json!({
            "allOf": [ { "$ref": "#/components/schemas/Animal" } ],
            "discriminator": { "propertyName": "petType" }
        }));
        assert_eq!(
            base.ignored,
            ["discriminator `petType` has no oneOf or anyOf to pick a branch from; ignored"]
        );

        let plain = lower_json(json!({
            "type": "object",
            "properties": { "petType": { "type": "string" } },
            "discriminator": { "propertyName": "petType" }
        }));
        assert_eq!(plain.ignored.len(), 1);

        let tagged = lower_json(json!({
            "oneOf": [ { "$ref": "#/components/schemas/Dog" } ],
            "discriminator": { "propertyName": "petType" }
        }));
        assert!(tagged.ignored.is_empty());
    }
}
