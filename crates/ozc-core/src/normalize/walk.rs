use serde_json::Value;

/// Keys whose values are schemas inside a schema object.
const SCHEMA_CHILD_KEYS: &[&str] = &["items", "not", "additionalProperties", "contains"];
/// Keys whose values are lists of schemas.
const SCHEMA_LIST_KEYS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];
/// Keys whose values are maps of schemas.
const SCHEMA_MAP_KEYS: &[&str] = &["properties", "patternProperties"];
/// Keys holding literal values that must never be rewritten.
const LITERAL_KEYS: &[&str] = &["example", "examples", "default", "enum", "const"];

/// Visit every schema in a document, parents before children.
///
/// Schemas are found under `components.schemas`, under any `schema` key
/// (parameters, media types, headers), and recursively inside other schemas.
/// `f` may replace the schema value; the replacement's children are visited.
pub fn for_each_schema(document: &mut Value, f: &mut dyn FnMut(&mut Value)) {
    let Value::Object(map) = document else {
        return;
    };
    for (key, value) in map.iter_mut() {
        match key.as_str() {
            "components" => visit_components(value, f),
            "definitions" => visit_schema_map(value, f),
            k if LITERAL_KEYS.contains(&k) => {}
            _ => visit_schema_positions(value, f),
        }
    }
}

fn visit_components(components: &mut Value, f: &mut dyn FnMut(&mut Value)) {
    let Value::Object(map) = components else {
        return;
    };
    for (key, value) in map.iter_mut() {
        match key.as_str() {
            "schemas" => visit_schema_map(value, f),
            k if LITERAL_KEYS.contains(&k) => {}
            _ => visit_schema_positions(value, f),
        }
    }
}

/// Walk a non-schema part of the document looking for `schema` keys.
fn visit_schema_positions(value: &mut Value, f: &mut dyn FnMut(&mut Value)) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match key.as_str() {
                    "schema" => visit_schema(child, f),
                    k if LITERAL_KEYS.contains(&k) => {}
                    _ => visit_schema_positions(child, f),
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                visit_schema_positions(child, f);
            }
        }
        _ => {}
    }
}

fn visit_schema_map(value: &mut Value, f: &mut dyn FnMut(&mut Value)) {
    if let Value::Object(map) = value {
        for schema in map.values_mut() {
            visit_schema(schema, f);
        }
    }
}

/// Visit one schema and everything nested in it.
pub fn visit_schema(schema: &mut Value, f: &mut dyn FnMut(&mut Value)) {
    if !schema.is_object() {
        return;
    }
    f(schema);
    let Value::Object(map) = schema else {
        return;
    };
    for (key, child) in map.iter_mut() {
        let key = key.as_str();
        if SCHEMA_CHILD_KEYS.contains(&key) {
            visit_schema(child, f);
        } else if SCHEMA_MAP_KEYS.contains(&key) {
            visit_schema_map(child, f);
        } else if SCHEMA_LIST_KEYS.contains(&key)
            && let Value::Array(items) = child
        {
            for item in items {
                visit_schema(item, f);
            }
        }
    }
}

/// Apply `f` to every `$ref` string anywhere in the tree.
pub fn for_each_ref(value: &mut Value, f: &mut dyn FnMut(&mut String)) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match (key.as_str(), child) {
                    ("$ref", Value::String(target)) => f(target),
                    (k, _) if LITERAL_KEYS.contains(&k) => {}
                    (_, child) => for_each_ref(child, f),
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                for_each_ref(child, f);
            }
        }
        _ => {}
    }
}

/// Collect every `$ref` string in the tree, in document order.
pub fn collect_refs(value: &Value) -> Vec<&str> {
    let mut out = Vec::new();
    collect_refs_into(value, &mut out);
    out
}

fn collect_refs_into<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match (key.as_str(), child) {
                    ("$ref", Value::String(target)) => out.push(target),
                    (k, _) if LITERAL_KEYS.contains(&k) => {}
                    (_, child) => collect_refs_into(child, out),
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_refs_into(child, out);
            }
        }
        _ => {}
    }
}
