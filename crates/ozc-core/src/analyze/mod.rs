//! The Operation Analyzer: walks the path table and builds one
//! [`OperationDescriptor`] per method and path.

pub mod security;

use std::collections::HashSet;

use heck::ToPascalCase;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::config::{NamingConfig, NamingStrategy};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::ResolveError;
use crate::ir::*;
use crate::load::Location;
use crate::naming::{normalize_name, route_to_name, unique_name};
use crate::parse::operation::{
    MediaType, Operation, Parameter, ParameterOrRef, RequestBody, RequestBodyOrRef, Response,
    ResponseOrRef,
};
use crate::parse::schema::SchemaOrRef;
use crate::parse::spec::OpenApiSpec;
use crate::resolve::{Resolution, Resolver};

/// `$ref → $ref` chains between parameters, bodies or responses longer
/// than this are rejected.
const MAX_REF_DEPTH: usize = 16;

/// Header parameters the transport owns; declaring them has no effect.
const IGNORED_HEADERS: &[&str] = &["accept", "content-type", "authorization"];

/// Type names each operation unit exports, as suffixes of the operation's
/// PascalCase name.
pub const OPERATION_EXPORT_SUFFIXES: &[&str] = &[
    "Query",
    "Path",
    "Headers",
    "Body",
    "Request",
    "Responses",
    "Result",
];

/// Analyze every operation in the document. Schemas are lowered through
/// `resolver`, so the returned descriptors still carry registry keys;
/// pass them through [`finalize`] once resolution is finished.
pub fn analyze(
    spec: &OpenApiSpec,
    resolver: &mut Resolver<'_>,
    naming: &NamingConfig,
    diagnostics: &mut Diagnostics,
) -> Vec<OperationDescriptor> {
    let root = resolver.root().clone();
    let schemes = spec
        .components
        .as_ref()
        .map(|c| c.security_schemes.clone())
        .unwrap_or_default();
    let mut analyzer = Analyzer {
        resolver,
        root,
        diagnostics,
    };

    let mut taken = HashSet::new();
    let mut operations = Vec::new();
    for (path, item) in &spec.paths {
        let path_level = match analyzer.parameters(&item.parameters, path) {
            Ok(params) => params,
            Err(err) => {
                analyzer.report(DiagnosticKind::Resolution, path, err.to_string());
                continue;
            }
        };
        for (method, op) in item.operations() {
            let id = operation_id(method, path, op, naming);
            let id = unique_id(&id, &taken, analyzer.diagnostics);
            taken.insert(id.camel_case.clone());

            let requirements = security::effective(op.security.as_deref(), spec.security.as_deref());
            let security = security::resolve(requirements, &schemes);
            let subject = id.original.clone();
            match analyzer.build(id, method, path, op, &path_level, security) {
                Ok(descriptor) => operations.push(descriptor),
                Err(err) => analyzer.report(DiagnosticKind::Resolution, &subject, err.to_string()),
            }
        }
    }
    log::debug!("analyzed {} operation(s)", operations.len());
    operations
}

/// Rewrite the operations' schemas to final type names. Operations that
/// depend on a skipped type are dropped; operations whose exported names
/// clash with a named type are renamed.
pub fn finalize(
    operations: Vec<OperationDescriptor>,
    resolution: &Resolution,
    diagnostics: &mut Diagnostics,
) -> Vec<OperationDescriptor> {
    let mut type_names: HashSet<String> = resolution.registry.names().map(String::from).collect();
    let mut finished = Vec::with_capacity(operations.len());
    for mut op in operations {
        let subject = op.id.original.clone();
        if let Err(skipped) = finalize_nodes(&mut op, resolution) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::SkippedDependency,
                subject,
                format!("skipped because `{skipped}` was skipped"),
            ));
            continue;
        }

        let clashes = |pascal: &str| {
            OPERATION_EXPORT_SUFFIXES
                .iter()
                .any(|suffix| type_names.contains(&format!("{pascal}{suffix}")))
        };
        if clashes(&op.id.pascal_case) {
            let base = op.id.camel_case.clone();
            let renamed = (2..)
                .map(|n| format!("{base}{n}"))
                .find(|camel| !clashes(&camel.to_pascal_case()))
                .unwrap_or(base);
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::IdentifierCollision,
                subject,
                format!("renamed to `{renamed}` to avoid clashing with a named type"),
            ));
            op.id.pascal_case = renamed.to_pascal_case();
            op.id.camel_case = renamed;
        }
        for suffix in OPERATION_EXPORT_SUFFIXES {
            type_names.insert(format!("{}{suffix}", op.id.pascal_case));
        }
        finished.push(op);
    }
    finished
}

fn finalize_nodes(op: &mut OperationDescriptor, resolution: &Resolution) -> Result<(), String> {
    for param in op
        .path_level_parameters
        .iter_mut()
        .chain(op.parameters.query.iter_mut())
        .chain(op.parameters.path.iter_mut())
        .chain(op.parameters.header.iter_mut())
        .chain(op.parameters.cookie.iter_mut())
    {
        resolution.finalize(&mut param.schema)?;
    }
    if let Some(body) = &mut op.request_body {
        for mapping in &mut body.content {
            resolution.finalize(&mut mapping.schema)?;
        }
    }
    for response in op.responses.values_mut() {
        for mapping in &mut response.content {
            resolution.finalize(&mut mapping.schema)?;
        }
    }
    Ok(())
}

/// Raw operation name per naming strategy, with aliases applied.
fn operation_id(
    method: HttpMethod,
    path: &str,
    op: &Operation,
    naming: &NamingConfig,
) -> String {
    let raw = match naming.strategy {
        NamingStrategy::UseOperationId => op
            .operation_id
            .clone()
            .unwrap_or_else(|| route_to_name(method.as_str(), path)),
        NamingStrategy::UseRouteBased => route_to_name(method.as_str(), path),
    };
    naming.aliases.get(&raw).cloned().unwrap_or(raw)
}

fn unique_id(raw: &str, taken: &HashSet<String>, diagnostics: &mut Diagnostics) -> NormalizedName {
    let mut name = normalize_name(raw);
    let camel = unique_name(&name.camel_case, taken);
    if camel != name.camel_case {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::IdentifierCollision,
            raw,
            format!("renamed to `{camel}`"),
        ));
        name.pascal_case = camel.to_pascal_case();
        name.camel_case = camel;
    }
    name
}

/// A `$ref`-able document object.
trait Referable: DeserializeOwned {
    type Target;

    /// The inline object, or the reference it points at.
    fn split(self) -> Result<Self::Target, String>;
}

impl Referable for ParameterOrRef {
    type Target = Parameter;

    fn split(self) -> Result<Parameter, String> {
        match self {
            ParameterOrRef::Parameter(p) => Ok(p),
            ParameterOrRef::Ref { ref_path } => Err(ref_path),
        }
    }
}

impl Referable for RequestBodyOrRef {
    type Target = RequestBody;

    fn split(self) -> Result<RequestBody, String> {
        match self {
            RequestBodyOrRef::RequestBody(b) => Ok(b),
            RequestBodyOrRef::Ref { ref_path } => Err(ref_path),
        }
    }
}

impl Referable for ResponseOrRef {
    type Target = Response;

    fn split(self) -> Result<Response, String> {
        match self {
            ResponseOrRef::Response(r) => Ok(r),
            ResponseOrRef::Ref { ref_path } => Err(ref_path),
        }
    }
}

struct Analyzer<'a, 'l> {
    resolver: &'a mut Resolver<'l>,
    root: Location,
    diagnostics: &'a mut Diagnostics,
}

impl Analyzer<'_, '_> {
    fn report(&mut self, kind: DiagnosticKind, subject: &str, message: String) {
        self.diagnostics.push(Diagnostic::new(kind, subject, message));
    }

    /// Follow a document object to its inline form and the document it
    /// lives in.
    fn follow<R: Referable + Clone>(&mut self, item: &R) -> Result<(Location, R::Target), ResolveError> {
        let mut base = self.root.clone();
        let mut current = item.clone();
        for _ in 0..MAX_REF_DEPTH {
            match current.split() {
                Ok(target) => return Ok((base, target)),
                Err(reference) => {
                    let (location, value) = self.resolver.resolve_value(&base, &reference)?;
                    current = serde_json::from_value(value)
                        .map_err(|e| ResolveError::Malformed(reference.clone(), e.to_string()))?;
                    base = location;
                }
            }
        }
        Err(ResolveError::Circular(format!("{MAX_REF_DEPTH} nested references")))
    }

    fn schema(
        &mut self,
        schema: Option<&SchemaOrRef>,
        base: &Location,
        subject: &str,
    ) -> Result<SchemaNode, ResolveError> {
        let Some(schema) = schema else {
            return Ok(SchemaNode::Any);
        };
        let (node, problems) = self.resolver.lower_inline(schema, base)?;
        for problem in problems {
            self.report(DiagnosticKind::Discriminator, subject, problem);
        }
        Ok(node)
    }

    fn parameters(
        &mut self,
        params: &[ParameterOrRef],
        subject: &str,
    ) -> Result<Vec<ParameterDescriptor>, ResolveError> {
        let mut out = Vec::with_capacity(params.len());
        for param in params {
            let (base, param) = self.follow(param)?;
            if param.location == ParameterLocation::Header
                && IGNORED_HEADERS.contains(&param.name.to_lowercase().as_str())
            {
                log::debug!("{subject}: ignoring header parameter `{}`", param.name);
                continue;
            }
            let schema = self.schema(param.effective_schema(), &base, subject)?;
            out.push(ParameterDescriptor {
                required: param.required || param.location == ParameterLocation::Path,
                name: param.name,
                location: param.location,
                description: param.description,
                schema,
            });
        }
        Ok(out)
    }

    fn content(
        &mut self,
        content: &IndexMap<String, MediaType>,
        base: &Location,
        subject: &str,
    ) -> Result<Vec<ContentTypeMapping>, ResolveError> {
        content
            .iter()
            .map(|(content_type, media)| {
                Ok(ContentTypeMapping {
                    content_type: content_type.clone(),
                    schema: self.schema(media.schema.as_ref(), base, subject)?,
                })
            })
            .collect()
    }

    fn build(
        &mut self,
        id: NormalizedName,
        method: HttpMethod,
        path: &str,
        op: &Operation,
        path_level: &[ParameterDescriptor],
        security: ResolvedSecurity,
    ) -> Result<OperationDescriptor, ResolveError> {
        let subject = id.original.clone();

        let mut merged: Vec<ParameterDescriptor> = path_level.to_vec();
        for param in self.parameters(&op.parameters, &subject)? {
            match merged
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param,
                None => merged.push(param),
            }
        }
        let mut parameters = ParameterGroups::default();
        for param in merged {
            parameters.push(param);
        }

        let request_body = match &op.request_body {
            Some(body) => {
                let (base, body) = self.follow(body)?;
                Some(RequestBodyDescriptor {
                    required: body.required,
                    description: body.description,
                    content: self.content(&body.content, &base, &subject)?,
                })
            }
            None => None,
        };

        let mut responses = IndexMap::new();
        for (status, response) in &op.responses {
            let (base, response) = self.follow(response)?;
            responses.insert(
                status.clone(),
                ResponseDescriptor {
                    status: status.clone(),
                    description: response.description,
                    content: self.content(&response.content, &base, &subject)?,
                },
            );
        }

        Ok(OperationDescriptor {
            id,
            method,
            path_template: path.to_string(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            deprecated: op.deprecated.unwrap_or(false),
            tags: op.tags.clone(),
            path_level_parameters: path_level.to_vec(),
            parameters,
            request_body,
            responses,
            security,
        })
    }
}

#[cfg(test)]
mod tests;
