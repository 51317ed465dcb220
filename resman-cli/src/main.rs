use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::LevelFilter;
use resman_core::{PipelineOptions, ToolPaths, config::default_jobs};

/// Embed the resources declared in a C++ header into an object file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Header declaring the `resman::Resource<N>` variables
    #[arg(long = "res-header", value_name = "HEADER")]
    res_header: PathBuf,

    /// Object file to produce
    #[arg(short = 'o', long = "obj-name", value_name = "OBJECT")]
    obj_name: PathBuf,

    /// Include directory passed to the compiler (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Directory searched for resource files, in order (repeatable)
    #[arg(short = 'R', value_name = "DIR")]
    res_path: Vec<PathBuf>,

    /// Preprocessor definition for the header parse (repeatable)
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    define: Vec<String>,

    /// Target triple; the host is targeted when omitted
    #[arg(long, value_name = "TRIPLE")]
    mtriple: Option<String>,

    /// Keep intermediates in this directory instead of a temporary one
    #[arg(long, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Write the extracted resource list as JSON
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,

    #[arg(long, value_name = "PATH", env = "RESMAN_CLANG", default_value = "clang++")]
    clang_path: PathBuf,

    #[arg(long, value_name = "PATH", env = "RESMAN_LLVM_AS", default_value = "llvm-as")]
    llvm_as_path: PathBuf,

    #[arg(
        long,
        value_name = "PATH",
        env = "RESMAN_LLVM_LINK",
        default_value = "llvm-link"
    )]
    llvm_link_path: PathBuf,

    #[arg(long, value_name = "PATH", env = "RESMAN_LLC", default_value = "llc")]
    llc_path: PathBuf,

    /// Parallel compile jobs (defaults to the number of CPUs)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Log every tool invocation
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn execute(cli: Cli) -> Result<()> {
    let header = cli.res_header.clone();
    let config = options_from_cli(cli)
        .validate()
        .context("invalid build configuration")?;

    let summary = resman_core::run(&config)
        .with_context(|| format!("failed to build resources from {}", header.display()))?;

    println!(
        "Embedded {} resource(s) into {}",
        summary.resources.len(),
        summary.object.display()
    );
    for resource in &summary.resources {
        println!("  {} ({}) <- {}", resource.name, resource.declared_type, resource.source_path);
    }
    Ok(())
}

fn options_from_cli(cli: Cli) -> PipelineOptions {
    PipelineOptions {
        header: cli.res_header,
        output_object: cli.obj_name,
        include_paths: cli.include,
        resource_paths: cli.res_path,
        defines: cli.define,
        target_triple: cli.mtriple,
        working_dir: cli.working_dir,
        manifest: cli.manifest,
        tools: ToolPaths {
            compiler: cli.clang_path,
            assembler: cli.llvm_as_path,
            linker: cli.llvm_link_path,
            codegen: cli.llc_path,
        },
        jobs: cli.jobs.unwrap_or_else(default_jobs),
    }
}
