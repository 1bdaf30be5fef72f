//! One compilation run: load, normalize, resolve, analyze, then compile
//! every named type and operation into fragments an emitter can render.

use rayon::prelude::*;
use serde_json::Value;

use crate::analyze;
use crate::compile::{CompileOptions, ambiguity, compile_in, type_expr};
use crate::config::GenerationConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::DocumentError;
use crate::ir::{CodeFragment, ContentTypeMapping, OperationDescriptor, SchemaNode, TypeRegistry};
use crate::load::{DocumentLoader, Location, parse_document_text};
use crate::normalize::{self, Dialect};
use crate::parse;
use crate::resolve::Resolver;
use crate::wrapper::ValidationPipeline;

/// A named type ready for emission.
#[derive(Debug, Clone)]
pub struct CompiledType {
    pub name: String,
    pub description: Option<String>,
    pub cyclic: bool,
    pub validator: CodeFragment,
    /// Explicit TypeScript type, printed from the same node.
    pub type_expr: CodeFragment,
}

/// One content type of a response.
#[derive(Debug, Clone)]
pub struct CompiledContent {
    pub content_type: String,
    pub validator: CodeFragment,
}

#[derive(Debug, Clone)]
pub struct CompiledResponse {
    pub status: String,
    pub description: String,
    /// Empty for `void` responses.
    pub content: Vec<CompiledContent>,
}

/// An operation with its request pipeline and response validators.
#[derive(Debug, Clone)]
pub struct CompiledOperation {
    pub descriptor: OperationDescriptor,
    pub pipeline: ValidationPipeline,
    /// Every declared status, in document order.
    pub responses: Vec<CompiledResponse>,
}

impl CompiledOperation {
    /// Named types and helpers anything in this operation needs.
    pub fn requirements(&self) -> CodeFragment {
        let mut all = self.pipeline.requirements();
        for response in &self.responses {
            for content in &response.content {
                all.absorb(&content.validator);
            }
        }
        all
    }
}

/// Everything an emitter needs.
#[derive(Debug, Clone)]
pub struct CompiledApi {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    /// Declared server URLs, first is the default base URL.
    pub servers: Vec<String>,
    /// The dialect the input declared.
    pub dialect: Dialect,
    pub types: Vec<CompiledType>,
    pub operations: Vec<CompiledOperation>,
}

/// The result of a run that did not fail outright.
#[derive(Debug)]
pub struct Compilation {
    pub api: CompiledApi,
    pub diagnostics: Diagnostics,
}

/// Load the document at `input` and compile it.
pub fn compile_location(
    input: &str,
    loader: &dyn DocumentLoader,
    config: &GenerationConfig,
) -> Result<Compilation, DocumentError> {
    let location = Location::parse(input)?;
    let text = loader.load(&location)?;
    let document = parse_document_text(&text, &location)?;
    compile_document(location, document, loader, config)
}

/// Compile an already parsed document found at `location`. External
/// references are loaded relative to it through `loader`.
pub fn compile_document(
    location: Location,
    document: Value,
    loader: &dyn DocumentLoader,
    config: &GenerationConfig,
) -> Result<Compilation, DocumentError> {
    let normalized = normalize::normalize(document)?;
    let mut diagnostics = normalized.diagnostics;
    let spec = parse::from_value(&normalized.document)?;

    let mut resolver = Resolver::new(location, normalized.document, loader);
    resolver.register_components();
    let operations = analyze::analyze(&spec, &mut resolver, &config.naming, &mut diagnostics);
    let resolution = resolver.finish();
    let mut operation_diagnostics = Diagnostics::new();
    let operations = analyze::finalize(operations, &resolution, &mut operation_diagnostics);
    diagnostics.merge(resolution.diagnostics);
    diagnostics.merge(operation_diagnostics);

    let registry = &resolution.registry;
    report_ambiguities(registry, &operations, &mut diagnostics);

    let options = CompileOptions {
        strict_objects: config.strict_objects,
        coerce_scalars: false,
    };
    let named: Vec<_> = registry.iter().collect();
    let types: Vec<CompiledType> = named
        .par_iter()
        .map(|t| CompiledType {
            name: t.name.clone(),
            description: t.description.clone(),
            cyclic: t.cyclic,
            validator: compile_in(&t.node, &options, registry),
            type_expr: type_expr(&t.node),
        })
        .collect();
    let operations: Vec<CompiledOperation> = operations
        .into_par_iter()
        .map(|descriptor| compile_operation(descriptor, &options, registry))
        .collect();
    log::debug!(
        "compiled {} type(s) and {} operation(s)",
        types.len(),
        operations.len()
    );

    Ok(Compilation {
        api: CompiledApi {
            title: spec.info.title,
            version: spec.info.version,
            description: spec.info.description,
            servers: spec.servers.into_iter().map(|s| s.url).collect(),
            dialect: normalized.dialect,
            types,
            operations,
        },
        diagnostics,
    })
}

fn compile_operation(
    descriptor: OperationDescriptor,
    options: &CompileOptions,
    registry: &TypeRegistry,
) -> CompiledOperation {
    let pipeline = ValidationPipeline::synthesize(&descriptor, options.strict_objects, registry);
    let responses = descriptor
        .responses
        .values()
        .map(|response| CompiledResponse {
            status: response.status.clone(),
            description: response.description.clone(),
            content: response
                .content
                .iter()
                .map(|mapping| CompiledContent {
                    content_type: mapping.content_type.clone(),
                    validator: compile_in(&mapping.schema, options, registry),
                })
                .collect(),
        })
        .collect();
    CompiledOperation {
        descriptor,
        pipeline,
        responses,
    }
}

fn report_ambiguities(
    registry: &TypeRegistry,
    operations: &[OperationDescriptor],
    diagnostics: &mut Diagnostics,
) {
    let mut report = |subject: &str, node: &SchemaNode| {
        for message in ambiguity::ambiguities(node, registry) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::CompilationAmbiguity,
                subject,
                message,
            ));
        }
    };
    for named in registry.iter() {
        report(&named.name, &named.node);
    }
    for op in operations {
        let subject = op.id.original.as_str();
        for param in op.parameters.iter() {
            report(subject, &param.schema);
        }
        let bodies = op.request_body.iter().flat_map(|b| &b.content);
        let responses = op.responses.values().flat_map(|r| &r.content);
        for ContentTypeMapping { schema, .. } in bodies.chain(responses) {
            report(subject, schema);
        }
    }
}
