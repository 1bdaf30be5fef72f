use ozc_core::config::GenerationConfig;
use ozc_core::diagnostics::DiagnosticKind;
use ozc_core::error::DocumentError;
use ozc_core::load::{Location, MemoryLoader, parse_document_text};
use ozc_core::normalize::{Dialect, normalize};
use ozc_core::{compile_document, compile_location};

const PETSTORE: &str = include_str!("fixtures/petstore-3.0.yaml");
const SWAGGER: &str = include_str!("fixtures/swagger-2.0.yaml");
const CYCLES: &str = include_str!("fixtures/cycles-3.1.yaml");

fn parsed(text: &str) -> serde_json::Value {
    let location = Location::parse("file:///specs/api.yaml").unwrap();
    parse_document_text(text, &location).unwrap()
}

#[test]
fn normalization_is_idempotent() {
    for fixture in [PETSTORE, SWAGGER, CYCLES] {
        let once = normalize(parsed(fixture)).unwrap();
        let twice = normalize(once.document.clone()).unwrap();
        assert_eq!(twice.dialect, Dialect::OpenApi31);
        assert_eq!(once.document, twice.document);
    }
}

#[test]
fn swagger_servers_scenario() {
    let out = normalize(parsed(SWAGGER)).unwrap();
    assert_eq!(out.dialect, Dialect::Swagger2);
    assert_eq!(out.document["openapi"], "3.1.0");
    assert_eq!(out.document["servers"][0]["url"], "https://api.example.com/v1");
    assert!(out.document.get("definitions").is_none());
    assert!(out.document["components"]["schemas"]["Pet"].is_object());
    assert_eq!(
        out.document["components"]["securitySchemes"]["basicAuth"]["scheme"],
        "basic"
    );
}

#[test]
fn open_api_30_nullable_is_rewritten() {
    let out = normalize(parsed(PETSTORE)).unwrap();
    let name = &out.document["components"]["schemas"]["Animal"]["properties"]["name"];
    assert_eq!(name["type"], serde_json::json!(["string", "null"]));
    assert!(name.get("nullable").is_none());
    let lives = &out.document["components"]["schemas"]["Cat"]["allOf"][1]["properties"]["lives"];
    assert_eq!(lives["exclusiveMinimum"], 0);
    assert!(lives.get("minimum").is_none());
}

#[test]
fn unknown_version_passes_through_with_diagnostic() {
    let text = r#"
openapi: 4.0.0
info: { title: Future, version: "1" }
paths:
  /ping:
    get:
      operationId: ping
      responses: { "204": { description: pong } }
"#;
    let loader = MemoryLoader::new();
    let location = Location::parse("file:///specs/future.yaml").unwrap();
    let c = compile_document(location, parsed(text), &loader, &GenerationConfig::default())
        .expect("unknown versions are not fatal");
    assert_eq!(c.api.dialect, Dialect::Unknown("4.0.0".to_string()));
    assert_eq!(c.diagnostics.of_kind(DiagnosticKind::UnknownVersion).count(), 1);
    assert_eq!(c.api.operations.len(), 1);
}

#[test]
fn malformed_documents_are_fatal() {
    let missing_info = normalize(serde_json::json!({ "openapi": "3.0.0", "paths": {} }));
    assert!(matches!(missing_info, Err(DocumentError::MissingField(f)) if f == "info"));

    let missing_paths = normalize(serde_json::json!({ "swagger": "2.0", "info": {} }));
    assert!(matches!(missing_paths, Err(DocumentError::MissingField(f)) if f == "paths"));

    let not_a_mapping = normalize(serde_json::json!(["openapi"]));
    assert!(matches!(not_a_mapping, Err(DocumentError::Malformed(_))));
}

#[test]
fn unreadable_input_fails_before_compilation() {
    let loader = MemoryLoader::new();
    let result = compile_location("file:///specs/absent.yaml", &loader, &GenerationConfig::default());
    assert!(matches!(result, Err(DocumentError::Load(_))));

    let loader = MemoryLoader::new()
        .with("file:///specs/bad.json", "{ not json")
        .unwrap();
    let result = compile_location("file:///specs/bad.json", &loader, &GenerationConfig::default());
    assert!(matches!(result, Err(DocumentError::Json(_))));
}
