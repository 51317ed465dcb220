//! End-to-end orchestration: header -> AST -> records -> sources -> object.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::PipelineConfig;
use crate::driver::{self, BuildRequest};
use crate::error::CoreError;
use crate::extract;
use crate::resource::ResourceRecord;
use crate::synth;
use crate::toolchain::{Invocation, Stage};
use crate::workspace::Workspace;

/// Outcome of a successful [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub resources: Vec<ResourceRecord>,
    /// Synthesized sources. Only still on disk for a persistent workspace.
    pub sources: Vec<PathBuf>,
    pub object: PathBuf,
}

/// Run the whole pipeline inside a fresh workspace.
///
/// The workspace is released whether or not a stage fails; the output
/// object is only written when every stage succeeded.
pub fn run(config: &PipelineConfig) -> Result<BuildSummary, CoreError> {
    Workspace::scoped(config.working_dir(), |workspace| run_in(config, workspace))
}

fn run_in(config: &PipelineConfig, workspace: &Workspace) -> Result<BuildSummary, CoreError> {
    let ast_path = workspace.ast_path();
    dump_ast(config, &ast_path)?;

    let resources = extract::extract_file(&ast_path)?;
    if let Some(manifest) = config.manifest() {
        extract::write_manifest(&resources, manifest)?;
    }

    let sources = synth::synthesize(&resources, &workspace.source_dir(), config.resource_paths())?;

    let object = driver::build(&BuildRequest {
        source_dir: workspace.source_dir(),
        working_dir: workspace.build_dir(),
        output_object: config.output_object().to_path_buf(),
        target_triple: config.target_triple().map(str::to_string),
        include_paths: config.include_paths().to_vec(),
        tools: config.tools().clone(),
        jobs: config.jobs(),
    })?;

    info!(
        "embedded {} resource(s) into {}",
        resources.len(),
        object.display()
    );
    Ok(BuildSummary {
        resources,
        sources,
        object,
    })
}

/// Have the compiler dump the header's AST as JSON into `output`.
pub fn dump_ast(config: &PipelineConfig, output: &Path) -> Result<(), CoreError> {
    let header = config.header();
    if !header.is_file() {
        return Err(CoreError::InputNotFound(header.to_path_buf()));
    }
    info!("dumping AST of {}", header.display());
    ast_invocation(config).run_to_file(output)
}

fn ast_invocation(config: &PipelineConfig) -> Invocation {
    let mut invocation = Invocation::new(Stage::AstDump, &config.tools().compiler).args([
        "-Xclang",
        "-ast-dump=json",
        "-fsyntax-only",
        "-x",
        "c++-header",
    ]);
    if let Some(triple) = config.target_triple() {
        invocation = invocation.arg(format!("--target={triple}"));
    }
    for include in config.include_paths() {
        invocation = invocation.arg(driver::include_flag(include));
    }
    for define in config.defines() {
        invocation = invocation.arg(format!("-D{define}"));
    }
    invocation.arg(config.header())
}
