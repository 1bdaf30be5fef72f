pub mod emitters;
pub mod error;
pub mod generator;

pub use error::GeneratorError;
pub use generator::TypeScriptGenerator;
