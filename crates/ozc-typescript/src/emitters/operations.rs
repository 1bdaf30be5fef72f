use std::collections::BTreeSet;

use minijinja::{Environment, context};
use ozc_core::CompiledApi;
use ozc_core::config::{GenerationConfig, ResponseValidation};
use ozc_core::generate::{CompiledOperation, CompiledResponse};
use ozc_core::ir::{OperationDescriptor, ParameterDescriptor};
use ozc_core::wrapper::Stage;
use serde::Serialize;

use super::string_literal;

#[derive(Serialize)]
struct StageContext<'a> {
    key: &'static str,
    suffix: &'static str,
    tag: &'static str,
    validator: &'a str,
    optional: bool,
}

#[derive(Serialize)]
struct ContentContext<'a> {
    key: String,
    validator: &'a str,
}

#[derive(Serialize)]
struct ResponseContext<'a> {
    key: String,
    content: Vec<ContentContext<'a>>,
}

/// Emit `operations/<name>.ts`: stage validators, the request and result
/// types, the response schema map, and the client call and/or server
/// validator the config asks for.
pub fn emit_operation(
    env: &Environment<'_>,
    api: &CompiledApi,
    op: &CompiledOperation,
    config: &GenerationConfig,
) -> Result<String, minijinja::Error> {
    let descriptor = &op.descriptor;
    let name = &descriptor.id.pascal_case;

    let stages: Vec<StageContext<'_>> = op
        .pipeline
        .stages
        .iter()
        .map(|s| StageContext {
            key: s.stage.key(),
            suffix: s.stage.type_suffix(),
            tag: s.stage.error_tag(),
            validator: &s.validator.code,
            optional: stage_is_optional(descriptor, s.stage),
        })
        .collect();
    let input_optional = stages.iter().all(|s| s.optional);

    let responses: Vec<ResponseContext<'_>> = op.responses.iter().map(response_context).collect();

    let content_type = descriptor
        .request_body
        .as_ref()
        .and_then(|body| body.default_content_type())
        .map(string_literal);

    env.get_template("operation.ts.j2")?.render(context! {
        title => api.title,
        name => name,
        fn_name => descriptor.id.camel_case,
        support_imports => support_imports(op, config),
        imports => op.requirements().dependencies,
        doc => if config.no_jsdoc { Vec::new() } else { doc_lines(descriptor) },
        stages => stages,
        responses => responses,
        result_variants => result_variants(name, &op.responses),
        client => config.client,
        server => config.server,
        method => descriptor.method.as_str(),
        path => string_literal(&descriptor.path_template),
        content_type => content_type,
        input_optional => input_optional,
        eager => config.response_validation == ResponseValidation::Eager,
    })
}

fn response_context(response: &CompiledResponse) -> ResponseContext<'_> {
    ResponseContext {
        key: string_literal(&response.status),
        content: response
            .content
            .iter()
            .map(|c| ContentContext {
                key: string_literal(&c.content_type),
                validator: &c.validator.code,
            })
            .collect(),
    }
}

/// One `ApiResponse` per declared status and content type. Content-less
/// statuses carry `void` data.
pub fn result_variants(name: &str, responses: &[CompiledResponse]) -> Vec<String> {
    let mut variants = Vec::new();
    for response in responses {
        let key = string_literal(&response.status);
        if response.content.is_empty() {
            variants.push(format!("ApiResponse<{key}, void>"));
            continue;
        }
        for content in &response.content {
            let content_key = string_literal(&content.content_type);
            variants.push(format!(
                "ApiResponse<{key}, z.infer<(typeof {name}Responses)[{key}][{content_key}]>>"
            ));
        }
    }
    if variants.is_empty() {
        variants.push("never".to_string());
    }
    variants
}

/// Whether a caller may leave the stage out of the request entirely.
/// Security headers do not count; clients usually send them through
/// `ApiConfig.headers`.
fn stage_is_optional(op: &OperationDescriptor, stage: Stage) -> bool {
    let all_optional = |params: &[ParameterDescriptor]| params.iter().all(|p| !p.required);
    match stage {
        Stage::Query => all_optional(&op.parameters.query),
        Stage::Path => all_optional(&op.parameters.path),
        Stage::Headers => all_optional(&op.parameters.header),
        Stage::Body => op.request_body.as_ref().is_none_or(|body| !body.required),
    }
}

fn support_imports(op: &CompiledOperation, config: &GenerationConfig) -> Vec<String> {
    let mut names: Vec<String> = op
        .requirements()
        .helpers
        .iter()
        .map(|h| h.as_str().to_string())
        .collect();
    let mut extra = BTreeSet::from(["type ApiResponse"]);
    if config.client {
        extra.extend(["type ApiConfig", "defaultConfig", "request"]);
    }
    if config.server {
        extra.extend(["type RawRequest", "type ValidationOutcome"]);
    }
    names.extend(extra.into_iter().map(String::from));
    names
}

fn doc_lines(op: &OperationDescriptor) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(summary) = &op.summary {
        lines.extend(summary.lines().map(String::from));
    }
    if let Some(description) = &op.description {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.extend(description.lines().map(String::from));
    }
    if op.deprecated {
        lines.push("@deprecated".to_string());
    }
    lines
}
