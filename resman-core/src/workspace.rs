//! Working directory lifecycle for one pipeline run.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::TempDir;

use crate::error::CoreError;

const AST_FILE: &str = "ast.json";
const SOURCE_DIR: &str = "src";
const BUILD_DIR: &str = "build";

/// Directory holding the intermediates of a single run.
///
/// A caller-supplied directory is persistent and survives release. Without
/// one, a fresh directory is allocated under the system temp root and
/// removed on release (or on drop, if the run unwinds).
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    temp: Option<TempDir>,
}

impl Workspace {
    pub fn acquire(working_dir: Option<&Path>) -> Result<Self, CoreError> {
        let workspace = match working_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|source| CoreError::io(dir, source))?;
                Workspace {
                    root: dir.to_path_buf(),
                    temp: None,
                }
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("resman-")
                    .tempdir()
                    .map_err(|source| CoreError::io(std::env::temp_dir(), source))?;
                Workspace {
                    root: temp.path().to_path_buf(),
                    temp: Some(temp),
                }
            }
        };
        info!(
            "using {} working directory {}",
            if workspace.is_persistent() { "persistent" } else { "temporary" },
            workspace.root.display()
        );
        Ok(workspace)
    }

    /// Acquire a workspace, run `body` in it and release it on every path.
    ///
    /// The body's error wins over a release error; a release error after a
    /// successful body is only logged.
    pub fn scoped<T, F>(working_dir: Option<&Path>, body: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Workspace) -> Result<T, CoreError>,
    {
        let workspace = Workspace::acquire(working_dir)?;
        let result = body(&workspace);
        if let Err(err) = workspace.release() {
            warn!("failed to clean up working directory: {err}");
        }
        result
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_persistent(&self) -> bool {
        self.temp.is_none()
    }

    pub fn ast_path(&self) -> PathBuf {
        self.root.join(AST_FILE)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(SOURCE_DIR)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    /// Remove the directory tree if this workspace owns it.
    pub fn release(self) -> Result<(), CoreError> {
        match self.temp {
            Some(temp) => {
                temp.close().map_err(|source| CoreError::io(&self.root, source))?;
                info!("removed temporary working directory {}", self.root.display());
            }
            None => info!("keeping working directory {}", self.root.display()),
        }
        Ok(())
    }
}
