use serde::{Deserialize, Serialize};

/// Substring identifying the resource marker type in a declaration's type.
pub const RESOURCE_MARKER: &str = "resman::Resource<";

/// One resource declaration found in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Full qualified type, e.g. `const resman::Resource<1>`.
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Declared variable name. Empty for anonymous declarations.
    pub name: String,
    /// File path taken from the initializer, never empty.
    #[serde(rename = "path")]
    pub source_path: String,
}

impl ResourceRecord {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        source_path: impl Into<String>,
    ) -> Self {
        ResourceRecord {
            name: name.into(),
            declared_type: declared_type.into(),
            source_path: source_path.into(),
        }
    }
}
