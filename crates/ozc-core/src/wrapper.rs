//! The Operation Wrapper Synthesizer: one ordered validation pipeline per
//! operation, shared by the client and server emitters.

use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::compile::{CompileOptions, compile_in};
use crate::ir::{
    AdditionalPolicy, ArrayNode, CodeFragment, ObjectNode, OperationDescriptor,
    ParameterDescriptor, PrimitiveKind, PrimitiveNode, SchemaNode, TypeRegistry,
};

/// Named types are followed at most this deep when inlining parameters.
const MAX_ALIAS_DEPTH: usize = 8;

/// One section of a request, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Query,
    Path,
    Headers,
    Body,
}

impl Stage {
    /// The fixed evaluation order.
    pub const ORDER: [Stage; 4] = [Stage::Query, Stage::Path, Stage::Headers, Stage::Body];

    /// Key of the section in the raw request and in the validated value.
    pub fn key(&self) -> &'static str {
        match self {
            Stage::Query => "query",
            Stage::Path => "path",
            Stage::Headers => "headers",
            Stage::Body => "body",
        }
    }

    /// Tag of the failure variant this stage reports.
    pub fn error_tag(&self) -> &'static str {
        match self {
            Stage::Query => "query_error",
            Stage::Path => "path_error",
            Stage::Headers => "headers_error",
            Stage::Body => "body_error",
        }
    }

    /// Suffix of the exported schema for this stage.
    pub fn type_suffix(&self) -> &'static str {
        match self {
            Stage::Query => "Query",
            Stage::Path => "Path",
            Stage::Headers => "Headers",
            Stage::Body => "Body",
        }
    }
}

/// A stage with the validator it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StageValidator {
    pub stage: Stage,
    pub validator: CodeFragment,
}

/// Validators for an operation's request, in [`Stage::ORDER`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPipeline {
    pub stages: Vec<StageValidator>,
    /// Body validators by content type, document order. The body stage
    /// validates against the first.
    pub body_content: IndexMap<String, CodeFragment>,
}

/// All four sections after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedRequest {
    pub query: Value,
    pub path: Value,
    pub headers: Value,
    pub body: Value,
}

/// Result of running a pipeline: success, or the first stage that failed.
///
/// Serializes as `{"type": "ok", "value": ...}` or
/// `{"type": "<stage>_error", "error": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome<E> {
    Ok(ValidatedRequest),
    QueryError(E),
    PathError(E),
    HeadersError(E),
    BodyError(E),
}

impl<E> ValidationOutcome<E> {
    fn failed(stage: Stage, error: E) -> Self {
        match stage {
            Stage::Query => ValidationOutcome::QueryError(error),
            Stage::Path => ValidationOutcome::PathError(error),
            Stage::Headers => ValidationOutcome::HeadersError(error),
            Stage::Body => ValidationOutcome::BodyError(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok(_))
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            ValidationOutcome::Ok(_) => None,
            ValidationOutcome::QueryError(e)
            | ValidationOutcome::PathError(e)
            | ValidationOutcome::HeadersError(e)
            | ValidationOutcome::BodyError(e) => Some(e),
        }
    }

    /// The stage that failed, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            ValidationOutcome::Ok(_) => None,
            ValidationOutcome::QueryError(_) => Some(Stage::Query),
            ValidationOutcome::PathError(_) => Some(Stage::Path),
            ValidationOutcome::HeadersError(_) => Some(Stage::Headers),
            ValidationOutcome::BodyError(_) => Some(Stage::Body),
        }
    }
}

impl<E: Serialize> Serialize for ValidationOutcome<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationOutcome", 2)?;
        let (stage, error) = match self {
            ValidationOutcome::Ok(value) => {
                state.serialize_field("type", "ok")?;
                state.serialize_field("value", value)?;
                return state.end();
            }
            ValidationOutcome::QueryError(e) => (Stage::Query, e),
            ValidationOutcome::PathError(e) => (Stage::Path, e),
            ValidationOutcome::HeadersError(e) => (Stage::Headers, e),
            ValidationOutcome::BodyError(e) => (Stage::Body, e),
        };
        state.serialize_field("type", stage.error_tag())?;
        state.serialize_field("error", error)?;
        state.end()
    }
}

impl ValidationPipeline {
    /// Build the pipeline for an operation. `registry` holds the named
    /// types its schemas reference.
    pub fn synthesize(op: &OperationDescriptor, strict_objects: bool, registry: &TypeRegistry) -> Self {
        let options = CompileOptions {
            strict_objects,
            coerce_scalars: false,
        };
        let params = options.parameters();
        let stage_object = |node: SchemaNode| compile_in(&inline_scalars(node, registry), &params, registry);

        let query = stage_object(group_object(&op.parameters.query, None, false));
        let path = stage_object(group_object(&op.parameters.path, None, false));
        let headers = stage_object(headers_object(op));

        let body_content: IndexMap<String, CodeFragment> = op
            .request_body
            .iter()
            .flat_map(|body| &body.content)
            .map(|mapping| {
                (
                    mapping.content_type.clone(),
                    compile_in(&mapping.schema, &options, registry),
                )
            })
            .collect();
        let body = match (&op.request_body, body_content.values().next()) {
            (Some(body), Some(first)) if !body.required => {
                first.clone().map(|code| format!("{code}.optional()"))
            }
            (Some(_), Some(first)) => first.clone(),
            _ => CodeFragment::new("z.undefined()"),
        };

        let stages = Stage::ORDER
            .into_iter()
            .zip([query, path, headers, body])
            .map(|(stage, validator)| StageValidator { stage, validator })
            .collect();
        Self {
            stages,
            body_content,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageValidator> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Every dependency and helper of every stage.
    pub fn requirements(&self) -> CodeFragment {
        let mut all = CodeFragment::default();
        for stage in &self.stages {
            all.absorb(&stage.validator);
        }
        for fragment in self.body_content.values() {
            all.absorb(fragment);
        }
        all
    }

    /// Evaluate stages in order with `validate`, stopping at the first
    /// failure.
    pub fn run<E>(
        &self,
        mut validate: impl FnMut(&StageValidator) -> Result<Value, E>,
    ) -> ValidationOutcome<E> {
        let mut validated = ValidatedRequest::default();
        for stage in &self.stages {
            let value = match validate(stage) {
                Ok(value) => value,
                Err(error) => return ValidationOutcome::failed(stage.stage, error),
            };
            match stage.stage {
                Stage::Query => validated.query = value,
                Stage::Path => validated.path = value,
                Stage::Headers => validated.headers = value,
                Stage::Body => validated.body = value,
            }
        }
        ValidationOutcome::Ok(validated)
    }
}

/// Replace each parameter's reference to a scalar, enum or array named
/// type with the type itself. Parameter values arrive as strings, and
/// only inline scalars are compiled to coerce them.
fn inline_scalars(mut node: SchemaNode, registry: &TypeRegistry) -> SchemaNode {
    if let SchemaNode::Object(object) = &mut node {
        for schema in object.properties.values_mut() {
            *schema = coercible(schema, registry, 0);
        }
    }
    node
}

fn coercible(node: &SchemaNode, registry: &TypeRegistry, depth: usize) -> SchemaNode {
    match node {
        SchemaNode::Reference(r) if depth < MAX_ALIAS_DEPTH => match registry.get(&r.target) {
            Some(named) if !named.cyclic && is_parameter_value(&named.node, registry, depth) => {
                coercible(&named.node, registry, depth + 1)
            }
            _ => node.clone(),
        },
        SchemaNode::Array(a) => SchemaNode::Array(ArrayNode {
            items: Box::new(coercible(&a.items, registry, depth)),
            ..a.clone()
        }),
        SchemaNode::TypeArray(members) if node.nullable_inner().is_some() => {
            SchemaNode::TypeArray(members.iter().map(|m| coercible(m, registry, depth)).collect())
        }
        _ => node.clone(),
    }
}

/// Scalars, enums, arrays and nullable forms of them, through aliases.
fn is_parameter_value(node: &SchemaNode, registry: &TypeRegistry, depth: usize) -> bool {
    match node {
        SchemaNode::Primitive(_) | SchemaNode::Enum(_) | SchemaNode::Array(_) => true,
        SchemaNode::TypeArray(_) => node
            .nullable_inner()
            .is_some_and(|inner| is_parameter_value(inner, registry, depth)),
        SchemaNode::Reference(r) if depth < MAX_ALIAS_DEPTH => registry
            .get(&r.target)
            .is_some_and(|named| is_parameter_value(&named.node, registry, depth + 1)),
        _ => false,
    }
}

/// An object with one property per parameter.
fn group_object(
    params: &[ParameterDescriptor],
    additional: Option<AdditionalPolicy>,
    lowercase: bool,
) -> SchemaNode {
    let mut properties = IndexMap::new();
    let mut required = IndexSet::new();
    for param in params {
        let name = if lowercase {
            param.name.to_lowercase()
        } else {
            param.name.clone()
        };
        if param.required {
            required.insert(name.clone());
        }
        properties.insert(name, param.schema.clone());
    }
    SchemaNode::Object(ObjectNode {
        properties,
        required,
        additional,
        default: None,
    })
}

/// Header parameters plus the headers security schemes send. Header
/// objects are always open; transports add headers of their own.
fn headers_object(op: &OperationDescriptor) -> SchemaNode {
    let mut node = group_object(&op.parameters.header, Some(AdditionalPolicy::Open), true);
    if let SchemaNode::Object(object) = &mut node {
        for header in &op.security.headers {
            if object.properties.contains_key(&header.name) {
                continue;
            }
            object.properties.insert(
                header.name.clone(),
                SchemaNode::Primitive(PrimitiveNode::new(PrimitiveKind::String)),
            );
            if header.required {
                object.required.insert(header.name.clone());
            }
        }
    }
    node
}
