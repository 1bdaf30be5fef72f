use std::collections::BTreeSet;

use minijinja::{Environment, context};
use ozc_core::CompiledApi;
use ozc_core::generate::CompiledType;

/// Emit `types/<Name>.ts` for one named type.
///
/// Types on a reference cycle get an explicit TypeScript type so the
/// annotated validator can refer to itself; the rest infer theirs.
pub fn emit_type(
    env: &Environment<'_>,
    api: &CompiledApi,
    compiled: &CompiledType,
    no_jsdoc: bool,
) -> Result<String, minijinja::Error> {
    env.get_template("type.ts.j2")?.render(context! {
        title => api.title,
        name => compiled.name,
        description => compiled.description.as_ref().filter(|_| !no_jsdoc),
        cyclic => compiled.cyclic,
        validator => compiled.validator.code,
        type_expr => compiled.type_expr.code,
        helpers => compiled.validator.helpers.iter().map(|h| h.as_str()).collect::<Vec<_>>(),
        imports => imports(compiled),
    })
}

/// Other named types this unit refers to, in name order.
pub fn imports(compiled: &CompiledType) -> BTreeSet<&str> {
    let mut names: BTreeSet<&str> = compiled
        .validator
        .dependencies
        .iter()
        .map(String::as_str)
        .collect();
    if compiled.cyclic {
        names.extend(compiled.type_expr.dependencies.iter().map(String::as_str));
    }
    names.remove(compiled.name.as_str());
    names
}
