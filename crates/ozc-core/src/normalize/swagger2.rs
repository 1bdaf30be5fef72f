//! Swagger 2.0 → OpenAPI 3.0 conversion.

use serde_json::{Map, Value, json};

use super::walk;
use crate::error::DocumentError;

const DEFAULT_MEDIA_TYPE: &str = "application/json";
const FORM_MULTIPART: &str = "multipart/form-data";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Keys of a 2.0 non-body parameter (or header) that belong to its schema.
const PARAMETER_SCHEMA_KEYS: &[&str] = &[
    "type",
    "format",
    "items",
    "default",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "enum",
    "multipleOf",
    "x-nullable",
];

struct Context {
    consumes: Vec<String>,
    produces: Vec<String>,
    /// Global `body`/`formData` parameters, inlined wherever referenced.
    body_params: Map<String, Value>,
}

/// Convert a Swagger 2.0 document into OpenAPI 3.0 shape.
pub fn to_openapi30(mut document: Value) -> Result<Value, DocumentError> {
    walk::for_each_ref(&mut document, &mut rewrite_ref);
    let Value::Object(mut source) = document else {
        return Err(DocumentError::Malformed(
            "document root must be a mapping".to_string(),
        ));
    };

    let mut ctx = Context {
        consumes: media_types(source.get("consumes"))
            .unwrap_or_else(|| vec![DEFAULT_MEDIA_TYPE.to_string()]),
        produces: media_types(source.get("produces"))
            .unwrap_or_else(|| vec![DEFAULT_MEDIA_TYPE.to_string()]),
        body_params: Map::new(),
    };

    let mut out = Map::new();
    out.insert("openapi".to_string(), json!("3.0.3"));
    if let Some(info) = source.remove("info") {
        out.insert("info".to_string(), info);
    }
    out.insert("servers".to_string(), Value::Array(servers(&source)));

    let mut components = Map::new();
    if let Some(definitions) = source.remove("definitions") {
        components.insert("schemas".to_string(), definitions);
    }
    if let Some(Value::Object(params)) = source.remove("parameters") {
        let mut converted = Map::new();
        let mut request_bodies = Map::new();
        for (name, param) in params {
            if location_of(&param) == Some("body") {
                let body = body_to_request_body(param.clone(), &ctx.consumes);
                request_bodies.insert(name.clone(), body);
            }
            if is_body_like(&param) {
                ctx.body_params.insert(name, param);
            } else {
                converted.insert(name, convert_parameter(param));
            }
        }
        if !converted.is_empty() {
            components.insert("parameters".to_string(), Value::Object(converted));
        }
        if !request_bodies.is_empty() {
            components.insert("requestBodies".to_string(), Value::Object(request_bodies));
        }
    }
    if let Some(Value::Object(responses)) = source.remove("responses") {
        let converted: Map<String, Value> = responses
            .into_iter()
            .map(|(name, resp)| (name, convert_response(resp, &ctx.produces)))
            .collect();
        components.insert("responses".to_string(), Value::Object(converted));
    }
    if let Some(Value::Object(schemes)) = source.remove("securityDefinitions") {
        let converted: Map<String, Value> = schemes
            .into_iter()
            .map(|(name, scheme)| (name, convert_security_scheme(scheme)))
            .collect();
        components.insert("securitySchemes".to_string(), Value::Object(converted));
    }

    if let Some(Value::Object(paths)) = source.remove("paths") {
        let converted: Map<String, Value> = paths
            .into_iter()
            .map(|(path, item)| (path, convert_path_item(item, &ctx)))
            .collect();
        out.insert("paths".to_string(), Value::Object(converted));
    }
    if !components.is_empty() {
        out.insert("components".to_string(), Value::Object(components));
    }
    for key in ["security", "tags", "externalDocs"] {
        if let Some(value) = source.remove(key) {
            out.insert(key.to_string(), value);
        }
    }
    for (key, value) in source {
        if key.starts_with("x-") {
            out.insert(key, value);
        }
    }

    let mut out = Value::Object(out);
    walk::for_each_schema(&mut out, &mut convert_schema);
    Ok(out)
}

fn rewrite_ref(target: &mut String) {
    const MOVES: &[(&str, &str)] = &[
        ("#/definitions/", "#/components/schemas/"),
        ("#/parameters/", "#/components/parameters/"),
        ("#/responses/", "#/components/responses/"),
    ];
    for (old, new) in MOVES {
        if let Some(idx) = target.find(old) {
            target.replace_range(idx..idx + old.len(), new);
            return;
        }
    }
}

/// `host` + `basePath` + `schemes` → server URLs. Without a host the server
/// is relative.
fn servers(source: &Map<String, Value>) -> Vec<Value> {
    let base_path = source
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or("");
    let Some(host) = source.get("host").and_then(Value::as_str) else {
        let url = if base_path.is_empty() { "/" } else { base_path };
        return vec![json!({ "url": url })];
    };
    let schemes: Vec<String> =
        media_types(source.get("schemes")).unwrap_or_else(|| vec!["https".to_string()]);
    schemes
        .into_iter()
        .map(|scheme| json!({ "url": format!("{scheme}://{host}{base_path}") }))
        .collect()
}

fn media_types(value: Option<&Value>) -> Option<Vec<String>> {
    let list: Vec<String> = value?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    (!list.is_empty()).then_some(list)
}

fn location_of(param: &Value) -> Option<&str> {
    param.get("in").and_then(Value::as_str)
}

fn is_body_like(param: &Value) -> bool {
    matches!(location_of(param), Some("body" | "formData"))
}

/// Inline references to global body/formData parameters.
fn expand_param(param: Value, ctx: &Context) -> Value {
    let name = param
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix("#/components/parameters/"));
    match name.and_then(|n| ctx.body_params.get(n)) {
        Some(global) => global.clone(),
        None => param,
    }
}

fn convert_path_item(item: Value, ctx: &Context) -> Value {
    let Value::Object(mut item) = item else {
        return item;
    };

    let mut inherited_body = Vec::new();
    if let Some(Value::Array(params)) = item.remove("parameters") {
        let mut shared = Vec::new();
        for param in params {
            let param = expand_param(param, ctx);
            if is_body_like(&param) {
                inherited_body.push(param);
            } else {
                shared.push(convert_parameter(param));
            }
        }
        if !shared.is_empty() {
            item.insert("parameters".to_string(), Value::Array(shared));
        }
    }

    for method in METHODS {
        if let Some(op) = item.get_mut(*method) {
            let taken = op.take();
            *op = convert_operation(taken, &inherited_body, ctx);
        }
    }
    Value::Object(item)
}

fn convert_operation(op: Value, inherited_body: &[Value], ctx: &Context) -> Value {
    let Value::Object(mut op) = op else {
        return op;
    };
    let consumes = media_types(op.get("consumes")).unwrap_or_else(|| ctx.consumes.clone());
    let produces = media_types(op.get("produces")).unwrap_or_else(|| ctx.produces.clone());
    for key in ["consumes", "produces", "schemes"] {
        op.remove(key);
    }

    let own = match op.remove("parameters") {
        Some(Value::Array(params)) => params,
        _ => Vec::new(),
    };

    let mut params = Vec::new();
    let mut body = None;
    let mut form = Map::new();
    for param in inherited_body.iter().cloned().chain(own) {
        let param = expand_param(param, ctx);
        match location_of(&param) {
            Some("body") => body = Some(param),
            Some("formData") => {
                let name = param
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                form.insert(name, param);
            }
            _ => params.push(convert_parameter(param)),
        }
    }

    if !params.is_empty() {
        op.insert("parameters".to_string(), Value::Array(params));
    }
    if let Some(body) = body {
        op.insert("requestBody".to_string(), body_to_request_body(body, &consumes));
    } else if !form.is_empty() {
        op.insert("requestBody".to_string(), form_to_request_body(form, &consumes));
    }
    if let Some(Value::Object(responses)) = op.remove("responses") {
        let converted: Map<String, Value> = responses
            .into_iter()
            .map(|(status, resp)| (status, convert_response(resp, &produces)))
            .collect();
        op.insert("responses".to_string(), Value::Object(converted));
    }
    Value::Object(op)
}

/// Split the schema keys of a 2.0 parameter or header off into a schema.
fn take_schema_keys(map: &mut Map<String, Value>) -> Map<String, Value> {
    PARAMETER_SCHEMA_KEYS
        .iter()
        .filter_map(|key| map.remove(*key).map(|v| (key.to_string(), v)))
        .collect()
}

fn convert_parameter(param: Value) -> Value {
    let Value::Object(mut param) = param else {
        return param;
    };
    if param.contains_key("$ref") {
        return Value::Object(param);
    }
    let schema = take_schema_keys(&mut param);
    param.remove("collectionFormat");
    if !schema.is_empty() {
        param.insert("schema".to_string(), Value::Object(schema));
    }
    if param.get("in").and_then(Value::as_str) == Some("path") {
        param.insert("required".to_string(), Value::Bool(true));
    }
    Value::Object(param)
}

fn content_for(schema: &Value, media_types: &[String]) -> Value {
    let content: Map<String, Value> = media_types
        .iter()
        .map(|mt| (mt.clone(), json!({ "schema": schema })))
        .collect();
    Value::Object(content)
}

fn body_to_request_body(body: Value, consumes: &[String]) -> Value {
    let mut out = Map::new();
    if let Some(description) = body.get("description") {
        out.insert("description".to_string(), description.clone());
    }
    let schema = body.get("schema").cloned().unwrap_or_else(|| json!({}));
    out.insert("content".to_string(), content_for(&schema, consumes));
    out.insert(
        "required".to_string(),
        Value::Bool(body.get("required").and_then(Value::as_bool).unwrap_or(false)),
    );
    Value::Object(out)
}

fn form_to_request_body(form: Map<String, Value>, consumes: &[String]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut has_file = false;
    for (name, param) in form {
        let Value::Object(mut param) = param else {
            continue;
        };
        let mut schema = take_schema_keys(&mut param);
        has_file |= schema.get("type").and_then(Value::as_str) == Some("file");
        if let Some(description) = param.remove("description") {
            schema.insert("description".to_string(), description);
        }
        if param.get("required").and_then(Value::as_bool) == Some(true) {
            required.push(Value::String(name.clone()));
        }
        properties.insert(name, Value::Object(schema));
    }

    let media_type = if has_file || consumes.iter().any(|c| c == FORM_MULTIPART) {
        FORM_MULTIPART
    } else {
        FORM_URLENCODED
    };
    let is_required = !required.is_empty();
    let mut schema = json!({ "type": "object", "properties": properties });
    if is_required {
        schema["required"] = Value::Array(required);
    }
    json!({
        "content": { media_type: { "schema": schema } },
        "required": is_required,
    })
}

fn convert_response(resp: Value, produces: &[String]) -> Value {
    let Value::Object(mut resp) = resp else {
        return resp;
    };
    if resp.contains_key("$ref") {
        return Value::Object(resp);
    }
    resp.entry("description")
        .or_insert_with(|| Value::String(String::new()));
    resp.remove("examples");
    if let Some(schema) = resp.remove("schema") {
        resp.insert("content".to_string(), content_for(&schema, produces));
    }
    if let Some(Value::Object(headers)) = resp.get_mut("headers") {
        for header in headers.values_mut() {
            if let Value::Object(h) = header {
                let schema = take_schema_keys(h);
                h.insert("schema".to_string(), Value::Object(schema));
            }
        }
    }
    Value::Object(resp)
}

fn convert_security_scheme(scheme: Value) -> Value {
    let Value::Object(mut scheme) = scheme else {
        return scheme;
    };
    let kind = scheme.get("type").and_then(Value::as_str).map(String::from);
    match kind.as_deref() {
        Some("basic") => {
            scheme.insert("type".to_string(), json!("http"));
            scheme.insert("scheme".to_string(), json!("basic"));
        }
        Some("oauth2") => {
            let flow_name = match scheme.remove("flow").as_ref().and_then(Value::as_str) {
                Some("implicit") => "implicit",
                Some("password") => "password",
                Some("application") => "clientCredentials",
                _ => "authorizationCode",
            };
            let mut flow = Map::new();
            for key in ["authorizationUrl", "tokenUrl", "scopes"] {
                if let Some(value) = scheme.remove(key) {
                    flow.insert(key.to_string(), value);
                }
            }
            scheme.insert("flows".to_string(), json!({ flow_name: flow }));
        }
        _ => {}
    }
    Value::Object(scheme)
}

/// Schema-level 2.0 differences: `type: file` and string discriminators.
fn convert_schema(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };
    if map.get("type").and_then(Value::as_str) == Some("file") {
        map.insert("type".to_string(), json!("string"));
        map.insert("format".to_string(), json!("binary"));
    }
    if let Some(Value::String(property)) = map.get("discriminator") {
        let discriminator = json!({ "propertyName": property });
        map.insert("discriminator".to_string(), discriminator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(doc: Value) -> Value {
        to_openapi30(doc).unwrap()
    }

    #[test]
    fn test_servers_from_host_base_path_schemes() {
        let out = convert(json!({
            "swagger": "2.0",
            "info": { "title": "T", "version": "1" },
            "host": "api.example.com",
            "basePath": "/v1",
            "schemes": ["https"],
            "paths": {}
        }));
        assert_eq!(out["servers"], json!([{ "url": "https://api.example.com/v1" }]));
    }

    #[test]
    fn test_relative_server_without_host() {
        let out = convert(json!({ "swagger": "2.0", "basePath": "/api", "paths": {} }));
        assert_eq!(out["servers"], json!([{ "url": "/api" }]));
    }

    #[test]
    fn test_definitions_and_refs_move_to_components() {
        let out = convert(json!({
            "swagger": "2.0",
            "definitions": { "Pet": { "type": "object" }, "Pets": { "type": "array", "items": { "$ref": "#/definitions/Pet" } } },
            "paths": {}
        }));
        assert!(out["components"]["schemas"]["Pet"].is_object());
        assert_eq!(
            out["components"]["schemas"]["Pets"]["items"]["$ref"],
            "#/components/schemas/Pet"
        );
    }

    #[test]
    fn test_body_parameter_becomes_request_body() {
        let out = convert(json!({
            "swagger": "2.0",
            "consumes": ["application/json", "application/xml"],
            "paths": { "/pets": { "post": {
                "parameters": [
                    { "name": "body", "in": "body", "required": true, "schema": { "$ref": "#/definitions/Pet" } },
                    { "name": "dryRun", "in": "query", "type": "boolean" }
                ],
                "responses": { "201": { "description": "created" } }
            } } }
        }));
        let op = &out["paths"]["/pets"]["post"];
        let content = op["requestBody"]["content"].as_object().unwrap();
        let keys: Vec<&String> = content.keys().collect();
        assert_eq!(keys, ["application/json", "application/xml"]);
        assert_eq!(op["requestBody"]["required"], true);
        assert_eq!(op["parameters"][0]["schema"], json!({ "type": "boolean" }));
    }

    #[test]
    fn test_form_data_with_file_is_multipart() {
        let out = convert(json!({
            "swagger": "2.0",
            "paths": { "/upload": { "post": {
                "parameters": [
                    { "name": "file", "in": "formData", "type": "file", "required": true },
                    { "name": "note", "in": "formData", "type": "string" }
                ],
                "responses": { "200": { "description": "ok" } }
            } } }
        }));
        let body = &out["paths"]["/upload"]["post"]["requestBody"];
        let schema = &body["content"]["multipart/form-data"]["schema"];
        assert_eq!(schema["properties"]["file"], json!({ "type": "string", "format": "binary" }));
        assert_eq!(schema["required"], json!(["file"]));
    }

    #[test]
    fn test_response_schema_uses_produces() {
        let out = convert(json!({
            "swagger": "2.0",
            "produces": ["application/json"],
            "paths": { "/pets": { "get": {
                "produces": ["text/plain"],
                "responses": { "200": { "description": "ok", "schema": { "type": "string" } }, "404": { "description": "missing" } }
            } } }
        }));
        let responses = &out["paths"]["/pets"]["get"]["responses"];
        assert_eq!(responses["200"]["content"]["text/plain"]["schema"], json!({ "type": "string" }));
        assert!(responses["404"].get("content").is_none());
    }

    #[test]
    fn test_security_definitions() {
        let out = convert(json!({
            "swagger": "2.0",
            "securityDefinitions": {
                "basic": { "type": "basic" },
                "key": { "type": "apiKey", "name": "X-Api-Key", "in": "header" },
                "oauth": { "type": "oauth2", "flow": "application", "tokenUrl": "https://t", "scopes": {} }
            },
            "paths": {}
        }));
        let schemes = &out["components"]["securitySchemes"];
        assert_eq!(schemes["basic"], json!({ "type": "http", "scheme": "basic" }));
        assert_eq!(schemes["key"]["name"], "X-Api-Key");
        assert_eq!(schemes["oauth"]["flows"]["clientCredentials"]["tokenUrl"], "https://t");
    }

    #[test]
    fn test_global_body_parameter_is_inlined() {
        let out = convert(json!({
            "swagger": "2.0",
            "parameters": {
                "PetBody": { "name": "pet", "in": "body", "schema": { "type": "object" } },
                "Limit": { "name": "limit", "in": "query", "type": "integer" }
            },
            "paths": { "/pets": { "post": {
                "parameters": [ { "$ref": "#/parameters/PetBody" }, { "$ref": "#/parameters/Limit" } ],
                "responses": {}
            } } }
        }));
        let op = &out["paths"]["/pets"]["post"];
        assert!(op["requestBody"]["content"]["application/json"].is_object());
        assert_eq!(op["parameters"], json!([{ "$ref": "#/components/parameters/Limit" }]));
        assert!(out["components"]["parameters"].get("PetBody").is_none());
        assert!(out["components"]["requestBodies"]["PetBody"]["content"].is_object());
        assert_eq!(out["components"]["parameters"]["Limit"]["schema"], json!({ "type": "integer" }));
    }

    #[test]
    fn test_string_discriminator() {
        let out = convert(json!({
            "swagger": "2.0",
            "definitions": { "Pet": { "type": "object", "discriminator": "petType" } },
            "paths": {}
        }));
        assert_eq!(
            out["components"]["schemas"]["Pet"]["discriminator"],
            json!({ "propertyName": "petType" })
        );
    }
}
