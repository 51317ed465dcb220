use std::path::PathBuf;

use thiserror::Error;

use crate::toolchain::Stage;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("input file was not found at {0}")]
    InputNotFound(PathBuf),
    #[error("malformed AST document {path}: {source}")]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "resources `{first}` and `{second}` both map to the identifier `{ident}`"
    )]
    NameCollision {
        ident: String,
        first: String,
        second: String,
    },
    #[error("resource `{name}`: file {path:?} was not found in any of {searched:?}")]
    ResourceNotFound {
        name: String,
        path: String,
        searched: Vec<PathBuf>,
    },
    #[error("no generated sources were found in {0}")]
    NoSources(PathBuf),
    #[error("source {0} uses a name reserved for build intermediates")]
    ReservedSourceName(PathBuf),
    #[error("{stage} stage failed: `{tool}` {}{}", exit_status(.exit_code), stderr_suffix(.stderr))]
    ToolInvocation {
        stage: Stage,
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("{stage} stage failed: could not start `{tool}`: {source}")]
    ToolSpawn {
        stage: Stage,
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// The pipeline stage a tool failure belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CoreError::ToolInvocation { stage, .. } | CoreError::ToolSpawn { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}
