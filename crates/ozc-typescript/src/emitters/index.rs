use minijinja::{Environment, context};
use ozc_core::CompiledApi;

/// Emit `index.ts`, re-exporting every unit.
pub fn emit_index(env: &Environment<'_>, api: &CompiledApi) -> Result<String, minijinja::Error> {
    let types: Vec<&str> = api.types.iter().map(|t| t.name.as_str()).collect();
    let operations: Vec<&str> = api
        .operations
        .iter()
        .map(|op| op.descriptor.id.camel_case.as_str())
        .collect();
    env.get_template("index.ts.j2")?.render(context! {
        title => api.title,
        types => types,
        operations => operations,
    })
}
