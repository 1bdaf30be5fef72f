use super::*;
use crate::config::NamingConfig;
use crate::load::{MemoryLoader, parse_document_text};
use crate::normalize::normalize;
use crate::parse;

fn analyzed_with(yaml: &str, naming: &NamingConfig) -> (Vec<OperationDescriptor>, Diagnostics) {
    let location = Location::parse("file:///specs/api.yaml").unwrap();
    let value = parse_document_text(yaml, &location).unwrap();
    let normalized = normalize(value).unwrap();
    let spec = parse::from_value(&normalized.document).unwrap();
    let loader = MemoryLoader::new();
    let mut resolver = Resolver::new(location, normalized.document, &loader);
    resolver.register_components();
    let mut diagnostics = Diagnostics::new();
    let operations = analyze(&spec, &mut resolver, naming, &mut diagnostics);
    let resolution = resolver.finish();
    diagnostics.merge(resolution.diagnostics.clone());
    let operations = finalize(operations, &resolution, &mut diagnostics);
    (operations, diagnostics)
}

fn analyzed(yaml: &str) -> (Vec<OperationDescriptor>, Diagnostics) {
    analyzed_with(yaml, &NamingConfig::default())
}

fn find<'a>(ops: &'a [OperationDescriptor], id: &str) -> &'a OperationDescriptor {
    ops.iter()
        .find(|op| op.id.camel_case == id)
        .unwrap_or_else(|| panic!("no operation {id}"))
}

const PETSTORE: &str = r#"
openapi: 3.0.3
info: { title: Pets, version: "1" }
security:
  - bearer: []
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - $ref: '#/components/parameters/Limit'
        - name: Accept
          in: header
          schema: { type: string }
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { type: array, items: { $ref: '#/components/schemas/Pet' } }
        default:
          description: error
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Error' }
    post:
      operationId: createPet
      security: []
      requestBody:
        required: true
        content:
          application/json:
            schema: { $ref: '#/components/schemas/Pet' }
          application/x-www-form-urlencoded:
            schema: { $ref: '#/components/schemas/Pet' }
      responses:
        "201": { description: created }
        "400": { $ref: '#/components/responses/BadRequest' }
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        schema: { type: string }
      - name: verbose
        in: query
        schema: { type: boolean }
    get:
      parameters:
        - name: petId
          in: path
          required: true
          schema: { type: integer }
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Pet' }
        "404": { description: missing }
components:
  securitySchemes:
    bearer: { type: http, scheme: bearer }
  parameters:
    Limit:
      name: limit
      in: query
      schema: { type: integer, maximum: 100 }
  responses:
    BadRequest:
      description: bad request
      content:
        application/json:
          schema: { $ref: '#/components/schemas/Error' }
  schemas:
    Pet:
      type: object
      required: [id]
      properties:
        id: { type: integer }
        name: { type: string, nullable: true }
    Error:
      type: object
      properties:
        message: { type: string }
"#;

#[test]
fn test_every_status_is_kept_in_order() {
    let (ops, _) = analyzed(PETSTORE);
    let create = find(&ops, "createPet");
    let statuses: Vec<&str> = create.responses.keys().map(String::as_str).collect();
    assert_eq!(statuses, ["201", "400"]);
    assert!(create.responses["201"].is_void());
    assert_eq!(create.responses["400"].description, "bad request");
    assert_eq!(
        create.responses["400"].content[0].schema,
        SchemaNode::reference("Error2")
    );

    let list = find(&ops, "listPets");
    let statuses: Vec<&str> = list.responses.keys().map(String::as_str).collect();
    assert_eq!(statuses, ["200", "default"]);
    assert!(!list.responses["default"].is_success());
}

#[test]
fn test_request_content_keeps_document_order() {
    let (ops, _) = analyzed(PETSTORE);
    let body = find(&ops, "createPet").request_body.as_ref().unwrap();
    assert!(body.required);
    assert_eq!(body.default_content_type(), Some("application/json"));
    let types: Vec<&str> = body.content.iter().map(|m| m.content_type.as_str()).collect();
    assert_eq!(types, ["application/json", "application/x-www-form-urlencoded"]);
}

#[test]
fn test_operation_parameters_override_path_level() {
    let (ops, _) = analyzed(PETSTORE);
    let get = find(&ops, "getPet");
    assert_eq!(get.path_level_parameters.len(), 2);
    assert_eq!(get.parameters.path.len(), 1);
    let pet_id = &get.parameters.path[0];
    assert!(pet_id.required);
    assert!(matches!(
        &pet_id.schema,
        SchemaNode::Primitive(p) if p.kind == PrimitiveKind::Integer
    ));
    assert_eq!(get.parameters.query[0].name, "verbose");
    // the path-level declaration is required too, being a path parameter
    assert!(get.path_level_parameters[0].required);
}

#[test]
fn test_referenced_parameter_and_ignored_header() {
    let (ops, _) = analyzed(PETSTORE);
    let list = find(&ops, "listPets");
    assert_eq!(list.parameters.query.len(), 1);
    assert_eq!(list.parameters.query[0].name, "limit");
    assert!(list.parameters.header.is_empty());
}

#[test]
fn test_security_override() {
    let (ops, _) = analyzed(PETSTORE);
    let list = find(&ops, "listPets");
    assert_eq!(list.security.alternatives, [vec!["bearer".to_string()]]);
    assert_eq!(list.security.headers[0].name, "authorization");
    assert!(list.security.headers[0].required);

    let create = find(&ops, "createPet");
    assert!(create.security.alternatives.is_empty());
    assert!(create.security.headers.is_empty());
    assert!(create.security.is_anonymous());
}

#[test]
fn test_route_based_names() {
    let (ops, _) = analyzed(PETSTORE);
    assert_eq!(find(&ops, "getPet").id.pascal_case, "GetPet");

    let naming = NamingConfig {
        strategy: NamingStrategy::UseRouteBased,
        aliases: IndexMap::from([("createPets".to_string(), "addPet".to_string())]),
    };
    let (ops, _) = analyzed_with(PETSTORE, &naming);
    let ids: Vec<&str> = ops.iter().map(|op| op.id.camel_case.as_str()).collect();
    assert_eq!(ids, ["listPets", "addPet", "getPet"]);
}

#[test]
fn test_duplicate_and_reserved_ids_are_suffixed() {
    let yaml = r#"
openapi: 3.1.0
info: { title: t, version: "1" }
paths:
  /a:
    get: { operationId: fetchThing, responses: { "200": { description: ok } } }
  /b:
    get: { operationId: fetch_thing, responses: { "200": { description: ok } } }
  /:
    delete: { responses: { "204": { description: gone } } }
"#;
    let (ops, diagnostics) = analyzed(yaml);
    let ids: Vec<&str> = ops.iter().map(|op| op.id.camel_case.as_str()).collect();
    assert_eq!(ids, ["fetchThing", "fetchThing2", "delete2"]);
    assert_eq!(
        diagnostics.of_kind(DiagnosticKind::IdentifierCollision).count(),
        2
    );
}

#[test]
fn test_operation_clashing_with_type_is_renamed() {
    let yaml = r#"
openapi: 3.1.0
info: { title: t, version: "1" }
paths:
  /pets:
    get:
      operationId: listPets
      responses: { "200": { description: ok } }
components:
  schemas:
    ListPetsResult: { type: string }
"#;
    let (ops, diagnostics) = analyzed(yaml);
    assert_eq!(ops[0].id.camel_case, "listPets2");
    assert_eq!(ops[0].id.pascal_case, "ListPets2");
    assert_eq!(
        diagnostics.of_kind(DiagnosticKind::IdentifierCollision).count(),
        1
    );
}

#[test]
fn test_operation_on_missing_schema_is_skipped() {
    let yaml = r#"
openapi: 3.1.0
info: { title: t, version: "1" }
paths:
  /broken:
    get:
      operationId: broken
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Missing' }
  /fine:
    get:
      operationId: fine
      responses: { "204": { description: ok } }
"#;
    let (ops, diagnostics) = analyzed(yaml);
    let ids: Vec<&str> = ops.iter().map(|op| op.id.camel_case.as_str()).collect();
    assert_eq!(ids, ["fine"]);
    let skipped: Vec<&Diagnostic> = diagnostics
        .of_kind(DiagnosticKind::SkippedDependency)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].subject, "broken");
    assert!(skipped[0].message.contains("Missing"));
}

#[test]
fn test_missing_parameter_reference_skips_operation() {
    let yaml = r#"
openapi: 3.1.0
info: { title: t, version: "1" }
paths:
  /x:
    get:
      operationId: getX
      parameters:
        - $ref: '#/components/parameters/Nope'
      responses: { "200": { description: ok } }
"#;
    let (ops, diagnostics) = analyzed(yaml);
    assert!(ops.is_empty());
    let errors: Vec<&Diagnostic> = diagnostics.of_kind(DiagnosticKind::Resolution).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].subject, "getX");
}

#[test]
fn test_swagger_body_parameter_becomes_request_body() {
    let yaml = r#"
swagger: "2.0"
info: { title: t, version: "1" }
host: api.example.com
consumes: [application/json]
paths:
  /pets:
    post:
      operationId: addPet
      parameters:
        - in: body
          name: pet
          required: true
          schema: { $ref: '#/definitions/Pet' }
        - in: query
          name: dryRun
          type: boolean
      responses:
        "200":
          description: ok
          schema: { $ref: '#/definitions/Pet' }
definitions:
  Pet:
    type: object
    properties:
      name: { type: string }
"#;
    let (ops, _) = analyzed(yaml);
    let add = find(&ops, "addPet");
    let body = add.request_body.as_ref().unwrap();
    assert_eq!(body.default_content_type(), Some("application/json"));
    assert_eq!(body.content[0].schema, SchemaNode::reference("Pet"));
    assert_eq!(add.parameters.query[0].name, "dryRun");
    assert_eq!(add.responses["200"].content[0].schema, SchemaNode::reference("Pet"));
}
