//! Pipeline configuration.
//!
//! Callers fill a [`PipelineOptions`] and turn it into a [`PipelineConfig`]
//! with [`PipelineOptions::validate`]; the pipeline only accepts the
//! validated form.

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::toolchain::ToolPaths;

/// Raw, unvalidated build parameters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub header: PathBuf,
    pub output_object: PathBuf,
    pub include_paths: Vec<PathBuf>,
    pub resource_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
    /// Empty or `None` targets the host.
    pub target_triple: Option<String>,
    /// Kept after the run when set. Concurrent runs must not share it.
    pub working_dir: Option<PathBuf>,
    /// Where to write the extracted resource list, if anywhere.
    pub manifest: Option<PathBuf>,
    pub tools: ToolPaths,
    pub jobs: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            header: PathBuf::new(),
            output_object: PathBuf::new(),
            include_paths: Vec::new(),
            resource_paths: Vec::new(),
            defines: Vec::new(),
            target_triple: None,
            working_dir: None,
            manifest: None,
            tools: ToolPaths::default(),
            jobs: default_jobs(),
        }
    }
}

impl PipelineOptions {
    pub fn new(header: impl Into<PathBuf>, output_object: impl Into<PathBuf>) -> Self {
        PipelineOptions {
            header: header.into(),
            output_object: output_object.into(),
            ..PipelineOptions::default()
        }
    }

    pub fn validate(self) -> Result<PipelineConfig, CoreError> {
        if self.header.as_os_str().is_empty() {
            return Err(CoreError::Config("resource header path is required".into()));
        }
        if self.output_object.as_os_str().is_empty() {
            return Err(CoreError::Config("output object path is required".into()));
        }
        if self.output_object.is_dir() {
            return Err(CoreError::Config(format!(
                "output object path {} is a directory",
                self.output_object.display()
            )));
        }
        if self.jobs == 0 {
            return Err(CoreError::Config("job count must be at least 1".into()));
        }
        self.tools.validate()?;

        let target_triple = self
            .target_triple
            .map(|triple| triple.trim().to_string())
            .filter(|triple| !triple.is_empty());
        let working_dir = self
            .working_dir
            .filter(|dir| !dir.as_os_str().is_empty());
        let include_paths = drop_empty(self.include_paths);
        let resource_paths = drop_empty(self.resource_paths);
        let defines = self
            .defines
            .into_iter()
            .filter(|define| !define.is_empty())
            .collect();

        Ok(PipelineConfig {
            header: self.header,
            output_object: self.output_object,
            include_paths,
            resource_paths,
            defines,
            target_triple,
            working_dir,
            manifest: self.manifest,
            tools: self.tools,
            jobs: self.jobs,
        })
    }
}

/// Validated configuration for one [`crate::pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    header: PathBuf,
    output_object: PathBuf,
    include_paths: Vec<PathBuf>,
    resource_paths: Vec<PathBuf>,
    defines: Vec<String>,
    target_triple: Option<String>,
    working_dir: Option<PathBuf>,
    manifest: Option<PathBuf>,
    tools: ToolPaths,
    jobs: usize,
}

impl PipelineConfig {
    pub fn header(&self) -> &Path {
        &self.header
    }

    pub fn output_object(&self) -> &Path {
        &self.output_object
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    pub fn resource_paths(&self) -> &[PathBuf] {
        &self.resource_paths
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    pub fn target_triple(&self) -> Option<&str> {
        self.target_triple.as_deref()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn manifest(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}

fn drop_empty(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| !path.as_os_str().is_empty())
        .collect()
}
