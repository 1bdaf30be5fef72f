use indexmap::IndexMap;

use crate::ir::{ResolvedSecurity, SecurityHeader};
use crate::parse::security::{ApiKeyLocation, SecurityRequirement, SecurityScheme, SecuritySchemeType};

/// The requirement list in effect: an operation-level list, even an empty
/// one, replaces the global list entirely.
pub fn effective<'a>(
    operation: Option<&'a [SecurityRequirement]>,
    global: Option<&'a [SecurityRequirement]>,
) -> &'a [SecurityRequirement] {
    operation.or(global).unwrap_or(&[])
}

/// The request header a scheme sends credentials in, lowercased.
pub fn header_of(scheme: &SecurityScheme) -> Option<String> {
    match scheme.scheme_type {
        SecuritySchemeType::ApiKey => match (scheme.location, &scheme.name) {
            (Some(ApiKeyLocation::Header), Some(name)) => Some(name.to_lowercase()),
            _ => None,
        },
        SecuritySchemeType::Http | SecuritySchemeType::OAuth2 | SecuritySchemeType::OpenIdConnect => {
            Some("authorization".to_string())
        }
        SecuritySchemeType::MutualTls => None,
    }
}

/// Resolve requirements to alternatives and the headers they need. A
/// header is required only when every alternative sends it.
pub fn resolve(
    requirements: &[SecurityRequirement],
    schemes: &IndexMap<String, SecurityScheme>,
) -> ResolvedSecurity {
    let alternatives: Vec<Vec<String>> = requirements
        .iter()
        .map(|requirement| requirement.keys().cloned().collect())
        .collect();

    let per_alternative: Vec<Vec<(String, &str)>> = alternatives
        .iter()
        .map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    let header = schemes.get(name).and_then(header_of);
                    if header.is_none() && !schemes.contains_key(name) {
                        log::debug!("security scheme `{name}` is not defined");
                    }
                    header.map(|h| (h, name.as_str()))
                })
                .collect()
        })
        .collect();

    let mut headers: IndexMap<String, Vec<String>> = IndexMap::new();
    for (header, scheme) in per_alternative.iter().flatten() {
        let users = headers.entry(header.clone()).or_default();
        if !users.iter().any(|s| s == scheme) {
            users.push(scheme.to_string());
        }
    }

    let headers = headers
        .into_iter()
        .map(|(name, schemes)| {
            let required = per_alternative
                .iter()
                .all(|alternative| alternative.iter().any(|(h, _)| *h == name));
            SecurityHeader {
                name,
                required,
                schemes,
            }
        })
        .collect();

    ResolvedSecurity {
        alternatives,
        headers,
    }
}
