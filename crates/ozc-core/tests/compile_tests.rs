use ozc_core::config::GenerationConfig;
use ozc_core::diagnostics::DiagnosticKind;
use ozc_core::generate::{CompiledOperation, CompiledType};
use ozc_core::load::MemoryLoader;
use ozc_core::normalize::Dialect;
use ozc_core::wrapper::Stage;
use ozc_core::{Compilation, compile_location};

const PETSTORE: &str = include_str!("fixtures/petstore-3.0.yaml");
const SWAGGER: &str = include_str!("fixtures/swagger-2.0.yaml");
const CYCLES: &str = include_str!("fixtures/cycles-3.1.yaml");
const EXTERNAL_ROOT: &str = include_str!("fixtures/external-root.yaml");
const SHARED_COMMON: &str = include_str!("fixtures/shared/common.yaml");
const SHARED_PET: &str = include_str!("fixtures/shared/pet.yaml");

fn compile_fixture(name: &str, text: &str) -> Compilation {
    compile_with(name, text, &GenerationConfig::default())
}

fn compile_with(name: &str, text: &str, config: &GenerationConfig) -> Compilation {
    let location = format!("file:///specs/{name}");
    let loader = MemoryLoader::new().with(&location, text).unwrap();
    compile_location(&location, &loader, config).expect("fixture should compile")
}

fn named<'a>(c: &'a Compilation, name: &str) -> &'a CompiledType {
    c.api
        .types
        .iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| panic!("no type {name}"))
}

fn operation<'a>(c: &'a Compilation, id: &str) -> &'a CompiledOperation {
    c.api
        .operations
        .iter()
        .find(|op| op.descriptor.id.camel_case == id)
        .unwrap_or_else(|| panic!("no operation {id}"))
}

fn stage(op: &CompiledOperation, stage: Stage) -> &str {
    &op.pipeline
        .stage(stage)
        .expect("every stage is present")
        .validator
        .code
}

#[test]
fn petstore_named_types() {
    let c = compile_fixture("petstore.yaml", PETSTORE);
    assert_eq!(c.api.dialect, Dialect::OpenApi30);
    assert_eq!(c.api.servers, ["https://petstore.example.com/v1"]);

    let names: Vec<&str> = c.api.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        ["Pet", "Animal", "Dog", "Cat", "Credentials", "Basic", "Secret", "Amount", "Error2"]
    );
    assert!(
        c.diagnostics
            .of_kind(DiagnosticKind::IdentifierCollision)
            .any(|d| d.subject == "Error")
    );
}

#[test]
fn petstore_discriminated_union_uses_tags() {
    let c = compile_fixture("petstore.yaml", PETSTORE);
    let pet = named(&c, "Pet");
    assert_eq!(pet.validator.code, r#"taggedUnion("petType", { dog: Dog, cat: Cat })"#);
    assert!(pet.validator.dependencies.contains("Dog"));
    assert!(pet.validator.dependencies.contains("Cat"));
}

#[test]
fn petstore_one_of_without_discriminator_is_exclusive() {
    let c = compile_fixture("petstore.yaml", PETSTORE);
    assert_eq!(named(&c, "Credentials").validator.code, "exclusiveUnion([Basic, Secret])");
}

#[test]
fn petstore_nullable_and_bounds() {
    let c = compile_fixture("petstore.yaml", PETSTORE);
    assert_eq!(
        named(&c, "Animal").validator.code,
        "z.object({ id: z.number().int(), name: z.string().nullable().optional() }).passthrough()"
    );
    assert_eq!(
        named(&c, "Cat").validator.code,
        r#"Animal.and(z.object({ petType: z.enum(["cat"]), lives: z.number().int().gt(0).optional() }).passthrough())"#
    );
    assert!(named(&c, "Dog").validator.code.contains("bark: z.boolean().default(true)"));
}

#[test]
fn petstore_strict_all_of_merges_into_one_closed_object() {
    let config = GenerationConfig {
        strict_objects: true,
        ..GenerationConfig::default()
    };
    let c = compile_with("petstore.yaml", PETSTORE, &config);
    assert!(named(&c, "Animal").validator.code.ends_with(".strict()"));
    let cat = &named(&c, "Cat").validator;
    assert_eq!(
        cat.code,
        r#"z.object({ id: z.number().int(), name: z.string().nullable().optional(), petType: z.enum(["cat"]), lives: z.number().int().gt(0).optional() }).strict()"#
    );
    assert!(!cat.code.contains(".and("));
    assert!(!cat.dependencies.contains("Animal"));
}

#[test]
fn petstore_ambiguous_any_of_is_reported() {
    let c = compile_fixture("petstore.yaml", PETSTORE);
    let ambiguous: Vec<&str> = c
        .diagnostics
        .of_kind(DiagnosticKind::CompilationAmbiguity)
        .map(|d| d.subject.as_str())
        .collect();
    assert_eq!(ambiguous, ["Amount"]);
}

#[test]
fn petstore_every_status_is_covered() {
    let c = compile_fixture("petstore.yaml", PETSTORE);
    for op in &c.api.operations {
        let declared: Vec<&String> = op.descriptor.responses.keys().collect();
        let compiled: Vec<&String> = op.responses.iter().map(|r| &r.status).collect();
        assert_eq!(declared, compiled, "{}", op.descriptor.id);
    }
    let create = operation(&c, "createPet");
    assert!(create.responses[0].content.is_empty());
    assert_eq!(create.responses[1].content[0].validator.code, "Error2");
}

#[test]
fn petstore_request_pipeline() {
    let c = compile_fixture("petstore.yaml", PETSTORE);
    let list = operation(&c, "listPets");
    assert_eq!(
        stage(list, Stage::Query),
        "z.object({ limit: z.coerce.number().int().gte(1).lte(100).optional(), tags: arrayParam(z.array(z.string())).optional() }).passthrough()"
    );
    assert_eq!(
        stage(list, Stage::Headers),
        r#"z.object({ "x-api-key": z.string().optional(), authorization: z.string().optional() }).passthrough()"#
    );
    assert_eq!(stage(list, Stage::Body), "z.undefined()");

    let show = operation(&c, "showPetById");
    assert!(show.descriptor.security.alternatives.is_empty());
    assert_eq!(stage(show, Stage::Headers), "z.object({}).passthrough()");
    assert_eq!(
        stage(show, Stage::Path),
        "z.object({ petId: z.coerce.number().int() }).passthrough()"
    );

    let create = operation(&c, "createPet");
    assert_eq!(stage(create, Stage::Body), "Pet");
    assert!(create.requirements().dependencies.contains("Error2"));
}

#[test]
fn swagger_document_is_normalized() {
    let c = compile_fixture("legacy.yaml", SWAGGER);
    assert_eq!(c.api.dialect, Dialect::Swagger2);
    assert_eq!(c.api.servers, ["https://api.example.com/v1"]);
    assert_eq!(
        named(&c, "Pet").validator.code,
        "z.object({ name: z.string(), tag: z.string().nullable().optional() }).passthrough()"
    );

    let add = operation(&c, "addPet");
    assert_eq!(
        add.descriptor
            .request_body
            .as_ref()
            .and_then(|b| b.default_content_type()),
        Some("application/json")
    );
    assert_eq!(stage(add, Stage::Body), "Pet");
    assert_eq!(
        stage(add, Stage::Headers),
        "z.object({ authorization: z.string() }).passthrough()"
    );
    let statuses: Vec<&str> = add.responses.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(statuses, ["200", "405"]);
    assert!(add.responses[1].content.is_empty());

    let upload = operation(&c, "uploadPhoto");
    let body = &upload.pipeline.body_content;
    assert_eq!(body.keys().collect::<Vec<_>>(), ["multipart/form-data"]);
    assert!(body["multipart/form-data"].code.contains("file: z.instanceof(Blob)"));
    assert_eq!(
        stage(upload, Stage::Path),
        "z.object({ petId: z.coerce.number().int() }).passthrough()"
    );
}

#[test]
fn cycles_compile_with_lazy_edges() {
    let c = compile_fixture("trees.yaml", CYCLES);
    let node = named(&c, "Node");
    assert!(node.cyclic);
    assert_eq!(
        node.validator.code,
        "z.object({ value: z.string().nullable(), children: z.array(z.lazy(() => Node)).optional() }).passthrough()"
    );
    assert!(node.type_expr.code.contains("children?: Array<Node>"));

    let a = named(&c, "A");
    let b = named(&c, "B");
    assert!(a.cyclic && b.cyclic);
    assert_eq!(a.validator.code, "z.object({ b: z.lazy(() => B).optional() }).passthrough()");
    assert_eq!(b.validator.code, "z.object({ a: z.lazy(() => A).optional() }).passthrough()");

    let leaf = named(&c, "Leaf");
    assert!(!leaf.cyclic);
    assert_eq!(leaf.validator.code, "z.object({ parent: Node.optional() }).passthrough()");

    let get = operation(&c, "getNode");
    assert_eq!(get.responses[0].content[0].validator.code, "Node");
}

#[test]
fn external_documents_are_resolved_and_failures_isolated() {
    let loader = MemoryLoader::new()
        .with("file:///specs/external-root.yaml", EXTERNAL_ROOT)
        .unwrap()
        .with("file:///specs/shared/common.yaml", SHARED_COMMON)
        .unwrap()
        .with("file:///specs/shared/pet.yaml", SHARED_PET)
        .unwrap();
    let c = compile_location(
        "file:///specs/external-root.yaml",
        &loader,
        &GenerationConfig::default(),
    )
    .unwrap();

    let names: Vec<&str> = c.api.types.iter().map(|t| t.name.as_str()).collect();
    assert!(!names.contains(&"Broken"));
    assert!(names.contains(&"Owner"));

    let pet = named(&c, "Pet");
    assert!(pet.validator.code.contains("owner: Owner.optional()"));
    assert!(pet.validator.code.contains("nickname: z.string().nullable().optional()"));
    assert_eq!(
        named(&c, "Error2").validator.code,
        "z.object({ code: z.number().int(), detail: z.string().nullable().optional() }).passthrough()"
    );

    let ids: Vec<&str> = c
        .api
        .operations
        .iter()
        .map(|op| op.descriptor.id.camel_case.as_str())
        .collect();
    assert_eq!(ids, ["listPets"]);
    let list = operation(&c, "listPets");
    assert_eq!(list.responses[0].content[0].validator.code, "z.array(Pet)");
    assert_eq!(list.responses[1].content[0].validator.code, "Error2");

    let resolution: Vec<&str> = c
        .diagnostics
        .of_kind(DiagnosticKind::Resolution)
        .map(|d| d.subject.as_str())
        .collect();
    assert_eq!(resolution, ["missing"]);
    let skipped: Vec<&str> = c
        .diagnostics
        .of_kind(DiagnosticKind::SkippedDependency)
        .map(|d| d.subject.as_str())
        .collect();
    assert_eq!(skipped, ["Broken", "getBroken"]);
}

#[test]
fn discriminator_on_inheritance_base_is_reported() {
    let text = r##"
openapi: 3.0.3
info: { title: Zoo, version: "1" }
paths: {}
components:
  schemas:
    Animal:
      allOf:
        - $ref: "#/components/schemas/Named"
      discriminator:
        propertyName: petType
    Named:
      type: object
      properties:
        name: { type: string }
"##;
    let c = compile_fixture("zoo.yaml", text);
    let reported: Vec<(&str, &str)> = c
        .diagnostics
        .of_kind(DiagnosticKind::Discriminator)
        .map(|d| (d.subject.as_str(), d.message.as_str()))
        .collect();
    assert_eq!(
        reported,
        [(
            "Animal",
            "discriminator `petType` has no oneOf or anyOf to pick a branch from; ignored"
        )]
    );
}
