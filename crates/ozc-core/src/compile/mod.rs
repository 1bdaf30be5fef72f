//! The Schema Compiler: `SchemaNode` → validator expression.
//!
//! Every function here is pure. A fragment's dependency set is the union
//! of its children's, so callers never share mutable import lists.

pub mod ambiguity;
pub mod literal;
pub mod typescript;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::ir::{
    AdditionalPolicy, ArrayNode, CodeFragment, CompositionKind, CompositionNode, EnumNode, Helper,
    ObjectNode, PrimitiveKind, PrimitiveNode, ReferenceNode, SchemaNode, TypeRegistry,
};

pub use typescript::type_expr;

/// Named types are followed at most this deep when merging or opening
/// `allOf` members.
const MAX_INLINE_DEPTH: usize = 8;

/// Knobs that change the emitted validators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Close objects that do not declare `additionalProperties`.
    pub strict_objects: bool,
    /// Accept string-encoded scalars (query, path and header values).
    pub coerce_scalars: bool,
}

impl CompileOptions {
    pub fn parameters(self) -> Self {
        Self {
            coerce_scalars: true,
            ..self
        }
    }
}

/// Compile a node into a validator expression.
pub fn compile(node: &SchemaNode, options: &CompileOptions) -> CodeFragment {
    Compiler::new(*options, None).node(node)
}

/// Compile a node that may reference the named types in `registry`.
///
/// In strict mode an `allOf` whose members all come down to plain objects
/// is merged into one closed object; other `allOf` members that name an
/// object are inlined in their open form.
pub fn compile_in(node: &SchemaNode, options: &CompileOptions, registry: &TypeRegistry) -> CodeFragment {
    Compiler::new(*options, Some(registry)).node(node)
}

#[derive(Clone, Copy)]
struct Compiler<'r> {
    options: CompileOptions,
    /// Objects directly under an `allOf` are never closed: each side of the
    /// intersection would reject the other's keys.
    in_intersection: bool,
    registry: Option<&'r TypeRegistry>,
    /// Named types inlined so far on this path.
    depth: usize,
}

impl<'r> Compiler<'r> {
    fn new(options: CompileOptions, registry: Option<&'r TypeRegistry>) -> Self {
        Self {
            options,
            in_intersection: false,
            registry,
            depth: 0,
        }
    }

    fn nested(self) -> Self {
        Self {
            in_intersection: false,
            ..self
        }
    }

    fn node(self, node: &SchemaNode) -> CodeFragment {
        match node {
            SchemaNode::Primitive(p) => self.primitive(p),
            SchemaNode::Null => CodeFragment::new("z.null()"),
            SchemaNode::Array(a) => self.array(a),
            SchemaNode::Object(o) => self.object(o),
            SchemaNode::Composition(c) => self.composition(c),
            SchemaNode::Reference(r) => reference(r),
            SchemaNode::Enum(e) => self.enumeration(e),
            SchemaNode::TypeArray(members) => self.type_array(node, members),
            SchemaNode::Any => CodeFragment::new("z.unknown()"),
            SchemaNode::Never => CodeFragment::new("z.never()"),
        }
    }

    fn primitive(self, p: &PrimitiveNode) -> CodeFragment {
        let coerce = self.options.coerce_scalars;
        let mut frag = match p.kind {
            PrimitiveKind::String => string_base(p),
            PrimitiveKind::Number | PrimitiveKind::Integer => {
                let mut code = if coerce {
                    "z.coerce.number()".to_string()
                } else {
                    "z.number()".to_string()
                };
                if p.kind == PrimitiveKind::Integer {
                    code.push_str(".int()");
                }
                let c = &p.constraints;
                for (method, bound) in [
                    ("gte", c.minimum),
                    ("lte", c.maximum),
                    ("gt", c.exclusive_minimum),
                    ("lt", c.exclusive_maximum),
                    ("multipleOf", c.multiple_of),
                ] {
                    if let Some(bound) = bound {
                        code.push_str(&format!(".{method}({})", literal::number(bound)));
                    }
                }
                CodeFragment::new(code)
            }
            PrimitiveKind::Boolean if coerce => {
                CodeFragment::new("booleanParam").with_helper(Helper::BooleanParam)
            }
            PrimitiveKind::Boolean => CodeFragment::new("z.boolean()"),
        };
        if let Some(default) = &p.default {
            frag = with_default(frag, default);
        }
        frag
    }

    fn array(self, a: &ArrayNode) -> CodeFragment {
        let items = self.nested().node(&a.items);
        let mut frag = items.map(|code| {
            let mut code = format!("z.array({code})");
            if let Some(min) = a.min_items {
                code.push_str(&format!(".min({min})"));
            }
            if let Some(max) = a.max_items {
                code.push_str(&format!(".max({max})"));
            }
            if a.unique_items {
                code.push_str(
                    ".refine((items) => new Set(items.map((item) => JSON.stringify(item))).size === items.length, { message: \"Items must be unique\" })",
                );
            }
            code
        });
        if self.options.coerce_scalars {
            frag = frag
                .map(|code| format!("arrayParam({code})"))
                .with_helper(Helper::ArrayParam);
        }
        if let Some(default) = &a.default {
            frag = with_default(frag, default);
        }
        frag
    }

    fn object(self, o: &ObjectNode) -> CodeFragment {
        let inner = self.nested();
        let mut keys = Vec::with_capacity(o.properties.len());
        let mut parts = Vec::with_capacity(o.properties.len() + 1);
        for (name, prop) in &o.properties {
            let mut frag = inner.node(prop);
            if !o.is_required(name) && default_of(prop).is_none() {
                frag = frag.map(|code| format!("{code}.optional()"));
            }
            keys.push(literal::property_key(name));
            parts.push(frag);
        }

        let policy = match &o.additional {
            Some(policy) => policy.clone(),
            None if self.options.strict_objects && !self.in_intersection => AdditionalPolicy::Closed,
            None => AdditionalPolicy::Open,
        };
        let catchall = match &policy {
            AdditionalPolicy::Typed(extra) => {
                parts.push(inner.node(extra));
                true
            }
            _ => false,
        };

        let mut frag = CodeFragment::combine(parts, |mut codes| {
            let extra = if catchall { codes.pop() } else { None };
            if keys.is_empty()
                && let Some(extra) = &extra
            {
                return format!("z.record(z.string(), {extra})");
            }
            let body = keys
                .iter()
                .zip(&codes)
                .map(|(key, code)| format!("{key}: {code}"))
                .collect::<Vec<_>>()
                .join(", ");
            let shape = if body.is_empty() {
                "z.object({})".to_string()
            } else {
                format!("z.object({{ {body} }})")
            };
            match (&policy, extra) {
                (AdditionalPolicy::Closed, _) => format!("{shape}.strict()"),
                (AdditionalPolicy::Open, _) => format!("{shape}.passthrough()"),
                (AdditionalPolicy::Typed(_), Some(extra)) => format!("{shape}.catchall({extra})"),
                (AdditionalPolicy::Typed(_), None) => shape,
            }
        });
        if let Some(default) = &o.default {
            frag = with_default(frag, default);
        }
        frag
    }

    fn composition(self, c: &CompositionNode) -> CodeFragment {
        if c.kind == CompositionKind::AllOf {
            if self.options.strict_objects
                && let Some(merged) = self.merged_object(&c.members, self.depth)
            {
                return self.object(&merged);
            }
            let member_compiler = Self {
                in_intersection: true,
                ..self
            };
            let members: Vec<CodeFragment> = c
                .members
                .iter()
                .map(|m| member_compiler.intersection_member(m))
                .collect();
            return CodeFragment::combine(members, |codes| {
                let mut codes = codes.into_iter();
                let first = codes.next().unwrap_or_else(|| "z.unknown()".to_string());
                codes.fold(first, |acc, code| format!("{acc}.and({code})"))
            });
        }

        // Union branches inside an intersection meet the other members' keys.
        let branch = |member: &SchemaNode| {
            if self.in_intersection {
                self.intersection_member(member)
            } else {
                self.nested().node(member)
            }
        };
        if let Some(d) = c.discriminator.as_ref().filter(|d| !d.branches.is_empty()) {
            let branches: Vec<CodeFragment> = d
                .branches
                .iter()
                .map(|(_, index)| branch(&c.members[*index]))
                .collect();
            let property = literal::string(&d.property_name);
            return CodeFragment::combine(branches, |codes| {
                let table = d
                    .branches
                    .iter()
                    .zip(codes)
                    .map(|((tag, _), code)| format!("{}: {code}", literal::property_key(tag)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("taggedUnion({property}, {{ {table} }})")
            })
            .with_helper(Helper::TaggedUnion);
        }

        let members: Vec<CodeFragment> = c.members.iter().map(|m| branch(m)).collect();
        match (c.kind, members.len()) {
            (_, 0) => CodeFragment::new("z.unknown()"),
            (_, 1) => members.into_iter().next().unwrap_or_default(),
            (CompositionKind::OneOf, _) => {
                CodeFragment::combine(members, |codes| format!("exclusiveUnion([{}])", codes.join(", ")))
                    .with_helper(Helper::ExclusiveUnion)
            }
            _ => CodeFragment::combine(members, |codes| format!("z.union([{}])", codes.join(", "))),
        }
    }

    /// Fold `allOf` members into one object. Every member must be a plain
    /// object, directly, through a named type or through a nested `allOf`.
    /// A key declared twice validates against both declarations.
    fn merged_object(self, members: &[SchemaNode], depth: usize) -> Option<ObjectNode> {
        let mut merged = ObjectNode {
            properties: IndexMap::new(),
            required: IndexSet::new(),
            additional: None,
            default: None,
        };
        for member in members {
            let object = self.flatten(member, depth)?;
            for (name, prop) in object.properties {
                match merged.properties.get_mut(&name) {
                    Some(existing) => {
                        let first = std::mem::replace(existing, SchemaNode::Any);
                        *existing = SchemaNode::Composition(CompositionNode {
                            kind: CompositionKind::AllOf,
                            members: vec![first, prop],
                            discriminator: None,
                        });
                    }
                    None => {
                        merged.properties.insert(name, prop);
                    }
                }
            }
            merged.required.extend(object.required);
        }
        Some(merged)
    }

    fn flatten(self, node: &SchemaNode, depth: usize) -> Option<ObjectNode> {
        if depth > MAX_INLINE_DEPTH {
            return None;
        }
        match node {
            SchemaNode::Object(o) if o.additional.is_none() && o.default.is_none() => Some(o.clone()),
            SchemaNode::Reference(r) => {
                let named = self.registry?.get(&r.target)?;
                self.flatten(&named.node, depth + 1)
            }
            SchemaNode::Composition(c) if c.kind == CompositionKind::AllOf => {
                self.merged_object(&c.members, depth + 1)
            }
            _ => None,
        }
    }

    /// An `allOf` member. In strict mode a named object or composition is
    /// inlined so the intersection sees it open.
    fn intersection_member(self, member: &SchemaNode) -> CodeFragment {
        if self.options.strict_objects
            && self.depth < MAX_INLINE_DEPTH
            && let SchemaNode::Reference(r) = member
            && let Some(named) = self.registry.and_then(|registry| registry.get(&r.target))
            && closes_in_strict_mode(&named.node)
        {
            let inlined = Self {
                depth: self.depth + 1,
                ..self
            };
            return inlined.node(&named.node);
        }
        self.node(member)
    }

    fn enumeration(self, e: &EnumNode) -> CodeFragment {
        let non_null: Vec<&Value> = e.values.iter().filter(|v| !v.is_null()).collect();
        let has_null = non_null.len() != e.values.len();
        let all_strings = !non_null.is_empty() && non_null.iter().all(|v| v.is_string());
        let all_numbers = !non_null.is_empty() && non_null.iter().all(|v| v.is_number());
        let all_booleans = !non_null.is_empty() && non_null.iter().all(|v| v.is_boolean());

        let mut frag = if all_strings {
            let list = non_null.iter().map(|v| literal::json(v)).collect::<Vec<_>>().join(", ");
            let base = format!("z.enum([{list}])");
            if e.is_extensible {
                CodeFragment::new(format!("z.union([{base}, z.string()])"))
            } else {
                CodeFragment::new(base)
            }
        } else if e.is_extensible {
            CodeFragment::new("z.unknown()")
        } else {
            let literals: Vec<String> = non_null
                .iter()
                .map(|v| format!("z.literal({})", literal::json(v)))
                .collect();
            let code = match literals.as_slice() {
                [] => "z.never()".to_string(),
                [single] => single.clone(),
                many => format!("z.union([{}])", many.join(", ")),
            };
            let mut frag = CodeFragment::new(code);
            if self.options.coerce_scalars && all_numbers {
                frag = frag.map(|code| format!("z.coerce.number().pipe({code})"));
            } else if self.options.coerce_scalars && all_booleans {
                frag = frag
                    .map(|code| format!("booleanParam.pipe({code})"))
                    .with_helper(Helper::BooleanParam);
            }
            frag
        };

        if has_null {
            frag = if non_null.is_empty() {
                CodeFragment::new("z.null()")
            } else {
                frag.map(|code| format!("{code}.nullable()"))
            };
        }
        if let Some(default) = &e.default {
            frag = with_default(frag, default);
        }
        frag
    }

    fn type_array(self, node: &SchemaNode, members: &[SchemaNode]) -> CodeFragment {
        if let Some(inner) = node.nullable_inner() {
            return self.node(inner).map(|code| format!("{code}.nullable()"));
        }
        let members: Vec<CodeFragment> = members.iter().map(|m| self.node(m)).collect();
        match members.len() {
            0 => CodeFragment::new("z.unknown()"),
            1 => members.into_iter().next().unwrap_or_default(),
            _ => CodeFragment::combine(members, |codes| format!("z.union([{}])", codes.join(", "))),
        }
    }
}

/// Whether strict mode closes this node's root or one of its branches.
fn closes_in_strict_mode(node: &SchemaNode) -> bool {
    match node {
        SchemaNode::Object(o) => o.additional.is_none(),
        SchemaNode::Composition(_) => true,
        _ => false,
    }
}

fn reference(r: &ReferenceNode) -> CodeFragment {
    let code = if r.deferred {
        format!("z.lazy(() => {})", r.target)
    } else {
        r.target.clone()
    };
    CodeFragment::new(code).with_dependency(r.target.clone())
}

fn string_base(p: &PrimitiveNode) -> CodeFragment {
    let format = p.format.as_deref();
    if format == Some("binary") {
        return CodeFragment::new("z.instanceof(Blob)");
    }
    let mut code = "z.string()".to_string();
    let method = match format {
        Some("email") => Some(".email()"),
        Some("uuid") => Some(".uuid()"),
        Some("date-time") => Some(".datetime({ offset: true })"),
        Some("date") => Some(".date()"),
        Some("time") => Some(".time()"),
        Some("uri" | "url") => Some(".url()"),
        Some("ipv4") => Some(".ip({ version: \"v4\" })"),
        Some("ipv6") => Some(".ip({ version: \"v6\" })"),
        Some("byte") => Some(".base64()"),
        _ => None,
    };
    if let Some(method) = method {
        code.push_str(method);
    }
    let c = &p.constraints;
    if let Some(min) = c.min_length {
        code.push_str(&format!(".min({min})"));
    }
    if let Some(max) = c.max_length {
        code.push_str(&format!(".max({max})"));
    }
    if let Some(pattern) = &c.pattern {
        code.push_str(&format!(".regex(new RegExp({}))", literal::string(pattern)));
    }
    CodeFragment::new(code)
}

fn with_default(frag: CodeFragment, default: &Value) -> CodeFragment {
    let value = literal::json(default);
    frag.map(|code| format!("{code}.default({value})"))
}

/// The default a node declares at its root, if any.
fn default_of(node: &SchemaNode) -> Option<&Value> {
    match node {
        SchemaNode::Primitive(p) => p.default.as_ref(),
        SchemaNode::Array(a) => a.default.as_ref(),
        SchemaNode::Object(o) => o.default.as_ref(),
        SchemaNode::Enum(e) => e.default.as_ref(),
        _ => None,
    }
}
