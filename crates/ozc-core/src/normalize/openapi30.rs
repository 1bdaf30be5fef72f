//! OpenAPI 3.0 → 3.1 rewrites.

use serde_json::{Map, Value, json};

use super::walk;

/// Rewrite a 3.0 document into 3.1 form.
pub fn to_openapi31(document: &mut Value) {
    walk::for_each_schema(document, &mut normalize_schema);
    if let Value::Object(map) = document {
        map.insert("openapi".to_string(), Value::String("3.1.0".to_string()));
    }
}

/// Rewrite a single 3.0 schema object (not its children). Schemas already
/// in 3.1 form are left untouched.
pub fn normalize_schema(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };
    rewrite_exclusive_bound(map, "exclusiveMinimum", "minimum");
    rewrite_exclusive_bound(map, "exclusiveMaximum", "maximum");
    if let Some(replacement) = apply_nullable_flag(map) {
        *schema = replacement;
    }
}

/// `minimum: 5, exclusiveMinimum: true` → `exclusiveMinimum: 5`.
fn rewrite_exclusive_bound(map: &mut Map<String, Value>, exclusive_key: &str, bound_key: &str) {
    match map.get(exclusive_key).and_then(Value::as_bool) {
        Some(true) => match map.remove(bound_key) {
            Some(bound) => {
                map.insert(exclusive_key.to_string(), bound);
            }
            None => {
                map.remove(exclusive_key);
            }
        },
        Some(false) => {
            map.remove(exclusive_key);
        }
        _ => {}
    }
}

/// `nullable: true` → `type: [T, "null"]`, or an `anyOf` with `null` when
/// the schema has no `type`. Returns a replacement for the whole schema in
/// the latter case.
fn apply_nullable_flag(map: &mut Map<String, Value>) -> Option<Value> {
    let nullable = ["nullable", "x-nullable"]
        .iter()
        .filter_map(|key| map.remove(*key))
        .any(|v| v.as_bool() == Some(true));

    if !nullable {
        return None;
    }

    if let Some(Value::Array(values)) = map.get_mut("enum")
        && !values.contains(&Value::Null)
    {
        values.push(Value::Null);
    }

    if let Some(type_val) = map.get_mut("type") {
        match type_val {
            Value::String(s) if s != "null" => {
                let widened = json!([s.as_str(), "null"]);
                *type_val = widened;
            }
            Value::Array(types) => {
                if !types.iter().any(|t| t.as_str() == Some("null")) {
                    types.push(Value::String("null".to_string()));
                }
            }
            _ => {}
        }
        return None;
    }

    let original = Value::Object(std::mem::take(map));
    Some(json!({ "anyOf": [original, { "type": "null" }] }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(mut schema: Value) -> Value {
        walk::visit_schema(&mut schema, &mut normalize_schema);
        schema
    }

    #[test]
    fn test_nullable_becomes_type_array() {
        let out = normalized(json!({ "type": "string", "nullable": true }));
        assert_eq!(out, json!({ "type": ["string", "null"] }));
    }

    #[test]
    fn test_nullable_false_is_dropped() {
        let out = normalized(json!({ "type": "string", "nullable": false }));
        assert_eq!(out, json!({ "type": "string" }));
    }

    #[test]
    fn test_nullable_without_type_wraps_any_of() {
        let out = normalized(json!({ "allOf": [{ "$ref": "#/components/schemas/Pet" }], "nullable": true }));
        assert_eq!(
            out,
            json!({ "anyOf": [
                { "allOf": [{ "$ref": "#/components/schemas/Pet" }] },
                { "type": "null" }
            ] })
        );
    }

    #[test]
    fn test_nullable_enum_admits_null() {
        let out = normalized(json!({ "type": "string", "enum": ["a", "b"], "nullable": true }));
        assert_eq!(out, json!({ "type": ["string", "null"], "enum": ["a", "b", null] }));
    }

    #[test]
    fn test_boolean_exclusive_bounds() {
        let out = normalized(json!({
            "type": "number",
            "minimum": 1, "exclusiveMinimum": true,
            "maximum": 9, "exclusiveMaximum": false
        }));
        assert_eq!(out, json!({ "type": "number", "exclusiveMinimum": 1, "maximum": 9 }));
    }

    #[test]
    fn test_nested_properties_are_rewritten() {
        let out = normalized(json!({
            "type": "object",
            "properties": { "tag": { "type": "string", "nullable": true } }
        }));
        assert_eq!(out["properties"]["tag"]["type"], json!(["string", "null"]));
    }

    #[test]
    fn test_already_31_schema_untouched() {
        let schema = json!({ "type": ["integer", "null"], "exclusiveMinimum": 0 });
        assert_eq!(normalized(schema.clone()), schema);
    }
}
