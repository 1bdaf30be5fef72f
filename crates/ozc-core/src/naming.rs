use std::collections::HashSet;

use heck::{ToLowerCamelCase, ToPascalCase};

use crate::ir::NormalizedName;

/// Identifiers generated code may not declare at module scope: language
/// keywords, globals the runtime relies on, the validation library import,
/// and the support unit's exports.
pub const RESERVED_IDENTIFIERS: &[&str] = &[
    // keywords
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield", "let", "static",
    "implements", "interface", "package", "private", "protected", "public", "await", "async",
    "undefined", "arguments", "eval", "fetch",
    // globals
    "Array", "Blob", "Boolean", "Date", "Error", "File", "FormData", "Function", "Headers",
    "Infinity", "JSON", "Map", "Math", "NaN", "Number", "Object", "Promise", "Proxy",
    "Record", "Reflect", "RegExp", "Request", "Response", "Set", "String", "Symbol",
    "Partial", "Required", "Readonly", "Pick", "Omit", "Exclude", "Extract", "Undefined",
    "URL", "URLSearchParams", "BigInt", "Unknown", "Never", "Any",
    // runtime
    "z", "Z", "ZodType",
    // support unit
    "ApiConfig", "ApiError", "ApiResponse", "ValidationOutcome", "taggedUnion",
    "exclusiveUnion", "booleanParam", "arrayParam", "request", "defaultConfig", "RawRequest",
];

/// Create a `NormalizedName` from an arbitrary string.
pub fn normalize_name(name: &str) -> NormalizedName {
    let sanitized = sanitize_identifier(name);
    NormalizedName {
        original: name.to_string(),
        pascal_case: ensure_leading_letter(sanitized.to_pascal_case()),
        camel_case: ensure_leading_letter(sanitized.to_lower_camel_case()),
    }
}

/// The PascalCase identifier a named type is emitted under, before
/// collision handling.
pub fn type_name(raw: &str) -> String {
    normalize_name(raw).pascal_case
}

/// Whether `name` clashes with a reserved identifier.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_IDENTIFIERS.contains(&name)
}

/// Suffix `candidate` with `2`, `3`, ... until it is neither reserved nor
/// already taken. Deterministic for a given `taken` set.
pub fn unique_name(candidate: &str, taken: &HashSet<String>) -> String {
    if !is_reserved(candidate) && !taken.contains(candidate) {
        return candidate.to_string();
    }
    (2..)
        .map(|n| format!("{candidate}{n}"))
        .find(|name| !is_reserved(name) && !taken.contains(name))
        .unwrap_or_else(|| candidate.to_string())
}

/// Derive a camelCase operation name from HTTP method + path.
///
/// Examples:
/// - `GET /users` → `listUsers`
/// - `POST /users` → `createUsers`
/// - `GET /users/{userId}` → `getUser`
/// - `PUT /users/{userId}` → `updateUser`
/// - `DELETE /users/{userId}` → `deleteUser`
/// - `GET /users/{userId}/messages` → `listUsersMessages`
pub fn route_to_name(method: &str, path: &str) -> String {
    let mut resource_parts: Vec<&str> = Vec::new();
    let mut ends_with_param = false;

    for seg in path.split('/').filter(|s| !s.is_empty()) {
        if seg.starts_with('{') && seg.ends_with('}') {
            ends_with_param = true;
        } else {
            resource_parts.push(seg);
            ends_with_param = false;
        }
    }

    let method_lower = method.to_lowercase();
    let prefix = match method_lower.as_str() {
        "get" if ends_with_param => "get",
        "get" => "list",
        "post" => "create",
        "put" => "update",
        other => other,
    };

    let mut pascal_parts = String::new();
    for (i, part) in resource_parts.iter().enumerate() {
        let word = if i + 1 == resource_parts.len() && ends_with_param {
            singularize(part)
        } else {
            part.to_string()
        };
        pascal_parts.push_str(&sanitize_identifier(&word).to_pascal_case());
    }

    format!("{prefix}{pascal_parts}")
}

/// Naive singularization: strips a trailing plural suffix.
fn singularize(word: &str) -> String {
    if word.ends_with("ies") && word.len() > 3 {
        format!("{}y", &word[..word.len() - 3])
    } else if word.ends_with("ses") || word.ends_with("xes") || word.ends_with("zes") {
        word[..word.len() - 2].to_string()
    } else if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Replace runs of non-alphanumeric characters with a single `_`.
fn sanitize_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev_was_separator = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if prev_was_separator && !result.is_empty() {
                result.push('_');
            }
            result.push(ch);
            prev_was_separator = false;
        } else {
            prev_was_separator = true;
        }
    }

    if result.is_empty() {
        return "unnamed".to_string();
    }
    result
}

fn ensure_leading_letter(name: String) -> String {
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{name}"),
        Some(_) => name,
        None => "_".to_string(),
    }
}
