use std::collections::HashSet;

use ozc_core::config::GenerationConfig;
use ozc_core::{CodeGenerator, CompiledApi, GeneratedFile};

use crate::emitters;
use crate::error::GeneratorError;

/// TypeScript + Zod code generator.
///
/// Lays the output out as one unit per named type under `types/`, one
/// per operation under `operations/`, a shared `support.ts` and an
/// `index.ts` barrel.
pub struct TypeScriptGenerator;

impl TypeScriptGenerator {
    /// Path of the unit a named type is emitted to.
    pub fn type_path(name: &str) -> String {
        format!("types/{name}.ts")
    }

    /// Path of the unit an operation is emitted to.
    pub fn operation_path(name: &str) -> String {
        format!("operations/{name}.ts")
    }
}

impl CodeGenerator for TypeScriptGenerator {
    type Config = GenerationConfig;
    type Error = GeneratorError;

    fn generate(
        &self,
        api: &CompiledApi,
        config: &GenerationConfig,
    ) -> Result<Vec<GeneratedFile>, GeneratorError> {
        check_dependencies(api)?;
        let env = emitters::environment()?;

        let mut files = Vec::with_capacity(api.types.len() + api.operations.len() + 2);
        files.push(GeneratedFile {
            path: "support.ts".to_string(),
            content: emitters::support::emit_support(&env, api, config)?,
        });
        for compiled in &api.types {
            files.push(GeneratedFile {
                path: Self::type_path(&compiled.name),
                content: emitters::types::emit_type(&env, api, compiled, config.no_jsdoc)?,
            });
        }
        for op in &api.operations {
            files.push(GeneratedFile {
                path: Self::operation_path(&op.descriptor.id.camel_case),
                content: emitters::operations::emit_operation(&env, api, op, config)?,
            });
        }
        files.push(GeneratedFile {
            path: "index.ts".to_string(),
            content: emitters::index::emit_index(&env, api)?,
        });

        log::debug!("rendered {} file(s)", files.len());
        Ok(files)
    }
}

/// Every name a unit imports must be a unit of its own.
fn check_dependencies(api: &CompiledApi) -> Result<(), GeneratorError> {
    let emitted: HashSet<&str> = api.types.iter().map(|t| t.name.as_str()).collect();
    let missing = |unit: &str, name: &str| GeneratorError::MissingDependency {
        unit: unit.to_string(),
        name: name.to_string(),
    };
    for compiled in &api.types {
        for name in emitters::types::imports(compiled) {
            if !emitted.contains(name) {
                return Err(missing(&compiled.name, name));
            }
        }
    }
    for op in &api.operations {
        for name in &op.requirements().dependencies {
            if !emitted.contains(name.as_str()) {
                return Err(missing(&op.descriptor.id.camel_case, name));
            }
        }
    }
    Ok(())
}
