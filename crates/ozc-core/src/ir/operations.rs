use indexmap::IndexMap;

use super::NormalizedName;
use super::schema::SchemaNode;
pub use crate::parse::operation::{HttpMethod, ParameterLocation};

/// One HTTP method on one path template, fully analyzed. Built once and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub id: NormalizedName,
    pub method: HttpMethod,
    pub path_template: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub tags: Vec<String>,
    /// Parameters declared on the path item, before operation overrides.
    pub path_level_parameters: Vec<ParameterDescriptor>,
    /// Effective parameters (path-level merged with operation-level).
    pub parameters: ParameterGroups,
    pub request_body: Option<RequestBodyDescriptor>,
    /// Every declared status, `default` included, in document order.
    pub responses: IndexMap<String, ResponseDescriptor>,
    pub security: ResolvedSecurity,
}

impl OperationDescriptor {
    /// Named types used anywhere in this operation.
    pub fn dependencies(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut add = |node: &SchemaNode| {
            for name in node.references() {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        };
        for param in self.parameters.iter() {
            add(&param.schema);
        }
        if let Some(body) = &self.request_body {
            for mapping in &body.content {
                add(&mapping.schema);
            }
        }
        for response in self.responses.values() {
            for mapping in &response.content {
                add(&mapping.schema);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: SchemaNode,
}

/// Parameters split by where they travel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGroups {
    pub query: Vec<ParameterDescriptor>,
    pub path: Vec<ParameterDescriptor>,
    pub header: Vec<ParameterDescriptor>,
    pub cookie: Vec<ParameterDescriptor>,
}

impl ParameterGroups {
    pub fn push(&mut self, param: ParameterDescriptor) {
        self.group_mut(param.location).push(param);
    }

    pub fn group(&self, location: ParameterLocation) -> &[ParameterDescriptor] {
        match location {
            ParameterLocation::Query => &self.query,
            ParameterLocation::Path => &self.path,
            ParameterLocation::Header => &self.header,
            ParameterLocation::Cookie => &self.cookie,
        }
    }

    fn group_mut(&mut self, location: ParameterLocation) -> &mut Vec<ParameterDescriptor> {
        match location {
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Cookie => &mut self.cookie,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.query
            .iter()
            .chain(&self.path)
            .chain(&self.header)
            .chain(&self.cookie)
    }
}

/// One content type of a body, with its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTypeMapping {
    pub content_type: String,
    pub schema: SchemaNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBodyDescriptor {
    pub required: bool,
    pub description: Option<String>,
    /// Document order; the first entry is the default content type.
    pub content: Vec<ContentTypeMapping>,
}

impl RequestBodyDescriptor {
    pub fn default_content_type(&self) -> Option<&str> {
        self.content.first().map(|m| m.content_type.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    pub status: String,
    pub description: String,
    /// Empty for statuses without a body; those carry `void` data.
    pub content: Vec<ContentTypeMapping>,
}

impl ResponseDescriptor {
    pub fn is_void(&self) -> bool {
        self.content.is_empty()
    }

    /// `2XX`/`200`-style success statuses. `default` is not a success.
    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }
}

/// A header carrying credentials for at least one accepted scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeader {
    /// Lowercased header name.
    pub name: String,
    /// Present in every accepted alternative.
    pub required: bool,
    /// Scheme names that use this header.
    pub schemes: Vec<String>,
}

/// The security requirement in effect for an operation. Operations without
/// authentication get an explicit value with no alternatives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSecurity {
    /// Accepted alternatives, each a list of scheme names that must all hold.
    pub alternatives: Vec<Vec<String>>,
    pub headers: Vec<SecurityHeader>,
}

impl ResolvedSecurity {
    pub fn none() -> Self {
        Self::default()
    }

    /// No credentials are required: no alternatives, or an empty one.
    pub fn is_anonymous(&self) -> bool {
        self.alternatives.is_empty() || self.alternatives.iter().any(Vec::is_empty)
    }
}
