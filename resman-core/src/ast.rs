//! Typed view of the clang JSON AST dump.
//!
//! Only the handful of attributes the resource extractor reads are
//! modelled; everything else in the document is ignored during
//! deserialization.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CoreError;

/// Node kind of a variable declaration.
pub const VAR_DECL: &str = "VarDecl";
/// Node kind of a constructor call expression.
pub const CONSTRUCT_EXPR: &str = "CXXConstructExpr";
/// Node kind of a string literal.
pub const STRING_LITERAL: &str = "StringLiteral";

/// A single node of the AST tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AstNode {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub ty: Option<QualType>,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    pub inner: Vec<AstNode>,
}

/// The `type` attribute carried by declarations and expressions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QualType {
    #[serde(default, rename = "qualType")]
    pub qual_type: Option<String>,
}

impl AstNode {
    pub fn new(kind: impl Into<String>) -> Self {
        AstNode {
            kind: Some(kind.into()),
            ..AstNode::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, qual_type: impl Into<String>) -> Self {
        self.ty = Some(QualType {
            qual_type: Some(qual_type.into()),
        });
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(serde_json::Value::String(value.into()));
        self
    }

    pub fn with_child(mut self, child: AstNode) -> Self {
        self.inner.push(child);
        self
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    pub fn qual_type(&self) -> Option<&str> {
        self.ty.as_ref().and_then(|ty| ty.qual_type.as_deref())
    }

    /// The `value` attribute, when clang emitted it as a string.
    pub fn value(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }

    pub fn children(&self) -> &[AstNode] {
        &self.inner
    }
}

pub fn parse_document(text: &str) -> Result<AstNode, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    // Every AST level costs two JSON levels (node object, `inner` array), so
    // the default limit of 128 cuts real dumps off at about 64 levels.
    deserializer.disable_recursion_limit();
    let root = AstNode::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(root)
}

/// Load an AST document from disk.
pub fn load_document(path: &Path) -> Result<AstNode, CoreError> {
    if !path.is_file() {
        return Err(CoreError::InputNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| CoreError::io(path, source))?;
    parse_document(&text).map_err(|source| CoreError::MalformedInput {
        path: path.to_path_buf(),
        source,
    })
}
