use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("{unit} refers to `{name}`, which is not emitted")]
    MissingDependency { unit: String, name: String },
}
