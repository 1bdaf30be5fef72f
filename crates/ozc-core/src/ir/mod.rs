pub mod fragment;
pub mod operations;
pub mod registry;
pub mod schema;

use std::fmt;

pub use fragment::{CodeFragment, Helper};
pub use operations::*;
pub use registry::{NamedType, TypeRegistry};
pub use schema::*;

/// A name with its casing variants pre-computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedName {
    pub original: String,
    pub pascal_case: String,
    pub camel_case: String,
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}
