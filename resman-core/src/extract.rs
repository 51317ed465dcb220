//! Resource discovery over the AST tree.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::ast::{self, AstNode, CONSTRUCT_EXPR, STRING_LITERAL, VAR_DECL};
use crate::error::CoreError;
use crate::resource::{RESOURCE_MARKER, ResourceRecord};

/// Collect every resource declaration in `root`, in document pre-order.
///
/// Declarations whose initializer carries no string literal are skipped
/// without error.
pub fn extract(root: &AstNode) -> Vec<ResourceRecord> {
    let mut records = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(record) = resource_from_decl(node) {
            debug!(
                "found resource `{}` ({}) -> {}",
                record.name, record.declared_type, record.source_path
            );
            records.push(record);
        }
        stack.extend(node.children().iter().rev());
    }
    records
}

/// Load the AST document at `path` and extract its resources.
pub fn extract_file(path: &Path) -> Result<Vec<ResourceRecord>, CoreError> {
    let root = ast::load_document(path)?;
    let records = extract(&root);
    info!("extracted {} resource(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Write `records` as a JSON array of `{type, name, path}` objects.
pub fn write_manifest(records: &[ResourceRecord], path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| CoreError::io(parent, source))?;
        }
    }
    let json = serde_json::to_string_pretty(records)
        .map_err(|source| CoreError::io(path, source.into()))?;
    fs::write(path, json).map_err(|source| CoreError::io(path, source))?;
    info!("resource manifest written to {}", path.display());
    Ok(())
}

fn resource_from_decl(node: &AstNode) -> Option<ResourceRecord> {
    if !node.is_kind(VAR_DECL) {
        return None;
    }
    let declared_type = node.qual_type()?;
    if !declared_type.contains(RESOURCE_MARKER) {
        return None;
    }
    let path = initializer_path(node)?;
    if path.is_empty() {
        return None;
    }
    Some(ResourceRecord::new(
        node.name.as_deref().unwrap_or_default(),
        declared_type,
        path,
    ))
}

fn initializer_path(decl: &AstNode) -> Option<&str> {
    decl.children()
        .iter()
        .filter(|child| child.is_kind(CONSTRUCT_EXPR))
        .find_map(|construct| {
            construct
                .children()
                .iter()
                .find(|arg| arg.is_kind(STRING_LITERAL))
                .and_then(AstNode::value)
                .map(strip_quotes)
        })
}

fn strip_quotes(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(raw)
}
