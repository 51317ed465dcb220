//! Structured invocation of the external LLVM tools.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::debug;

use crate::error::CoreError;

/// Pipeline stage an external tool runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    AstDump,
    LowerToIr,
    Assemble,
    Link,
    LowerToObject,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::AstDump => "ast-dump",
            Stage::LowerToIr => "lower-to-ir",
            Stage::Assemble => "assemble",
            Stage::Link => "link",
            Stage::LowerToObject => "lower-to-object",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Programs used for each tool. Bare names are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub compiler: PathBuf,
    pub assembler: PathBuf,
    pub linker: PathBuf,
    pub codegen: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            compiler: PathBuf::from("clang++"),
            assembler: PathBuf::from("llvm-as"),
            linker: PathBuf::from("llvm-link"),
            codegen: PathBuf::from("llc"),
        }
    }
}

impl ToolPaths {
    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        let tools = [
            ("compiler", &self.compiler),
            ("IR assembler", &self.assembler),
            ("bitcode linker", &self.linker),
            ("code generator", &self.codegen),
        ];
        for (role, path) in tools {
            if path.as_os_str().is_empty() {
                return Err(CoreError::Config(format!("{role} path cannot be empty")));
            }
        }
        Ok(())
    }
}

/// One external command with its argument vector.
#[derive(Debug, Clone)]
pub struct Invocation {
    stage: Stage,
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(stage: Stage, program: impl Into<PathBuf>) -> Self {
        Invocation {
            stage,
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn argv(&self) -> &[OsString] {
        &self.args
    }

    /// Command line for log output. Not meant to be fed to a shell.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("{arg:?}"));
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    /// Run to completion, capturing both output streams.
    pub fn run(&self) -> Result<Output, CoreError> {
        self.execute(Stdio::piped())
    }

    /// Run to completion with standard output redirected into `path`.
    pub fn run_to_file(&self, path: &Path) -> Result<(), CoreError> {
        let file = std::fs::File::create(path).map_err(|source| CoreError::io(path, source))?;
        self.execute(Stdio::from(file)).map(|_| ())
    }

    fn execute(&self, stdout: Stdio) -> Result<Output, CoreError> {
        debug!("[{}] {}", self.stage, self.display());
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        let output = command.output().map_err(|source| CoreError::ToolSpawn {
            stage: self.stage,
            tool: self.program.display().to_string(),
            source,
        })?;
        if !output.status.success() {
            return Err(CoreError::ToolInvocation {
                stage: self.stage,
                tool: self.program.display().to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output)
    }
}
