//! Lowers the synthesized sources to a single object file.
//!
//! The per-file stages (source -> `.ll` -> `.bc`) run on scoped worker
//! threads; linking waits for all of them and always consumes bitcode in
//! source discovery order.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::thread;

use log::info;
use walkdir::WalkDir;

use crate::error::CoreError;
use crate::toolchain::{Invocation, Stage, ToolPaths};

const SOURCE_EXTENSION: &str = "cpp";
const MERGED_STEM: &str = "resman_merged";
const MERGED_BITCODE: &str = "resman_merged.bc";
const STAGED_OBJECT: &str = "resman_staged.o";

/// Inputs of one driver run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub source_dir: PathBuf,
    pub working_dir: PathBuf,
    pub output_object: PathBuf,
    pub target_triple: Option<String>,
    pub include_paths: Vec<PathBuf>,
    pub tools: ToolPaths,
    pub jobs: usize,
}

/// Intermediates derived from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CompiledUnit {
    source: PathBuf,
    ir: PathBuf,
    bitcode: PathBuf,
}

/// List the sources in `dir`, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    if !dir.is_dir() {
        return Err(CoreError::NoSources(dir.to_path_buf()));
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            CoreError::io(path, err.into())
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
        {
            // Its bitcode would land on the link output.
            if path.file_stem().is_some_and(|stem| stem == MERGED_STEM) {
                return Err(CoreError::ReservedSourceName(path.to_path_buf()));
            }
            sources.push(path.to_path_buf());
        }
    }
    if sources.is_empty() {
        return Err(CoreError::NoSources(dir.to_path_buf()));
    }
    Ok(sources)
}

/// Run every stage and publish the object at `request.output_object`.
///
/// The output path is written only after code generation succeeded.
pub fn build(request: &BuildRequest) -> Result<PathBuf, CoreError> {
    let sources = discover_sources(&request.source_dir)?;
    info!(
        "compiling {} source(s) from {}",
        sources.len(),
        request.source_dir.display()
    );
    fs::create_dir_all(&request.working_dir)
        .map_err(|source| CoreError::io(&request.working_dir, source))?;

    let units = compile_units(request, &sources)?;

    let merged = request.working_dir.join(MERGED_BITCODE);
    info!("linking {} bitcode unit(s)", units.len());
    link_invocation(request, &units, &merged).run()?;

    let staged = request.working_dir.join(STAGED_OBJECT);
    info!("generating object code");
    codegen_invocation(request, &merged, &staged).run()?;

    publish(&staged, &request.output_object)?;
    info!("wrote {}", request.output_object.display());
    Ok(request.output_object.clone())
}

fn compile_units(
    request: &BuildRequest,
    sources: &[PathBuf],
) -> Result<Vec<CompiledUnit>, CoreError> {
    let jobs = request.jobs.clamp(1, sources.len().max(1));
    let chunk_size = sources.len().div_ceil(jobs);

    let results: Vec<Result<CompiledUnit, CoreError>> = thread::scope(|scope| {
        let workers: Vec<_> = sources
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    let mut done = Vec::with_capacity(chunk.len());
                    for source in chunk {
                        let unit = compile_unit(request, source);
                        let failed = unit.is_err();
                        done.push(unit);
                        if failed {
                            break;
                        }
                    }
                    done
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| match worker.join() {
                Ok(done) => done,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    // Chunks are contiguous and joined in order, so the first error here is
    // the first failing source in discovery order.
    results.into_iter().collect()
}

fn compile_unit(request: &BuildRequest, source: &Path) -> Result<CompiledUnit, CoreError> {
    let stem = source
        .file_stem()
        .ok_or_else(|| CoreError::NoSources(source.to_path_buf()))?;
    let intermediate = |extension: &str| {
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(extension);
        request.working_dir.join(name)
    };
    let unit = CompiledUnit {
        source: source.to_path_buf(),
        ir: intermediate("ll"),
        bitcode: intermediate("bc"),
    };

    ir_invocation(request, &unit).run()?;
    Invocation::new(Stage::Assemble, &request.tools.assembler)
        .arg(&unit.ir)
        .arg("-o")
        .arg(&unit.bitcode)
        .run()?;
    Ok(unit)
}

fn ir_invocation(request: &BuildRequest, unit: &CompiledUnit) -> Invocation {
    let mut invocation =
        Invocation::new(Stage::LowerToIr, &request.tools.compiler).args(["-S", "-emit-llvm"]);
    if let Some(triple) = &request.target_triple {
        invocation = invocation.arg(format!("--target={triple}"));
    }
    for include in &request.include_paths {
        invocation = invocation.arg(include_flag(include));
    }
    invocation.arg(&unit.source).arg("-o").arg(&unit.ir)
}

fn link_invocation(request: &BuildRequest, units: &[CompiledUnit], merged: &Path) -> Invocation {
    Invocation::new(Stage::Link, &request.tools.linker)
        .args(units.iter().map(|unit| &unit.bitcode))
        .arg("-o")
        .arg(merged)
}

fn codegen_invocation(request: &BuildRequest, merged: &Path, object: &Path) -> Invocation {
    let mut invocation =
        Invocation::new(Stage::LowerToObject, &request.tools.codegen).arg("-filetype=obj");
    if let Some(triple) = &request.target_triple {
        invocation = invocation.arg(format!("-mtriple={triple}"));
    }
    invocation.arg(merged).arg("-o").arg(object)
}

pub(crate) fn include_flag(dir: &Path) -> std::ffi::OsString {
    let mut flag = std::ffi::OsString::from("-I");
    flag.push(dir);
    flag
}

/// Move the staged object onto `output` with an atomic rename.
fn publish(staged: &Path, output: &Path) -> Result<(), CoreError> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|source| CoreError::io(&parent, source))?;

    let bytes = fs::read(staged).map_err(|source| CoreError::io(staged, source))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".resman-")
        .suffix(".o.tmp")
        .tempfile_in(&parent)
        .map_err(|source| CoreError::io(&parent, source))?;
    temp.write_all(&bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|source| CoreError::io(temp.path(), source))?;
    temp.persist(output)
        .map_err(|err| CoreError::io(output, err.error))?;
    Ok(())
}
