use minijinja::{Environment, context};
use ozc_core::CompiledApi;
use ozc_core::config::GenerationConfig;

use super::string_literal;

/// Emit `support.ts`: client configuration, response and outcome types,
/// and the runtime helpers validators call.
pub fn emit_support(
    env: &Environment<'_>,
    api: &CompiledApi,
    config: &GenerationConfig,
) -> Result<String, minijinja::Error> {
    env.get_template("support.ts.j2")?.render(context! {
        title => api.title,
        base_url => string_literal(&base_url(api, config)),
    })
}

/// The configured base URL, else the first declared server, else `/`.
pub fn base_url(api: &CompiledApi, config: &GenerationConfig) -> String {
    config
        .base_url
        .clone()
        .or_else(|| api.servers.first().cloned())
        .unwrap_or_else(|| "/".to_string())
}
