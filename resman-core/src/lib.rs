//! Core of the resman resource embedder.
//!
//! This crate turns resource declarations in a C++ header into a linkable
//! object file. The pipeline is roughly:
//!
//!   header .h
//!     -> clang AST dump   (JSON document)
//!     -> extract          (resource records)
//!     -> synth            (generated .cpp sources)
//!     -> driver           (.ll -> .bc -> merged .bc -> object)
//!
//! Higher-level tools (the CLI, build scripts) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and configuration
// ---------------------------------------------------------------------

pub mod config;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: AST model and resource discovery
// ---------------------------------------------------------------------

pub mod ast;
pub mod extract;
pub mod resource;

// ---------------------------------------------------------------------
// Back-end: source synthesis and the external toolchain
// ---------------------------------------------------------------------

pub mod driver;
pub mod synth;
pub mod toolchain;

// ---------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------

pub mod pipeline;
pub mod workspace;

#[cfg(all(test, unix))]
mod testing;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use config::{PipelineConfig, PipelineOptions};
pub use error::CoreError;
pub use extract::{extract, extract_file, write_manifest};
pub use pipeline::{BuildSummary, run};
pub use resource::ResourceRecord;
pub use synth::synthesize;
pub use toolchain::{Stage, ToolPaths};
pub use workspace::Workspace;
