pub mod analyze;
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod generate;
pub mod ir;
pub mod load;
pub mod naming;
pub mod normalize;
pub mod parse;
pub mod resolve;
pub mod wrapper;

pub use generate::{Compilation, CompiledApi, compile_document, compile_location};

/// A generated file with path and content.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Trait for code generators that render a compiled API into files.
pub trait CodeGenerator {
    type Config;
    type Error: std::error::Error;
    fn generate(
        &self,
        api: &CompiledApi,
        config: &Self::Config,
    ) -> Result<Vec<GeneratedFile>, Self::Error>;
}
