//! Shell-script stand-ins for the LLVM tools, used by the unit tests.
//!
//! Every fake tool appends `<name> <args>` to a shared call log. When
//! invoked with `-ast-dump=json` it prints the configured AST document;
//! otherwise it concatenates every existing input file into the `-o`
//! target, so the final "object" holds the synthesized sources in link
//! order.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::toolchain::ToolPaths;

const TOOLS: [&str; 4] = ["clang++", "llvm-as", "llvm-link", "llc"];

pub(crate) struct FakeToolchain {
    dir: TempDir,
}

impl FakeToolchain {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("bin")).expect("create bin dir");
        let fake = FakeToolchain { dir };
        fake.set_ast("{ \"kind\": \"TranslationUnitDecl\" }");
        for tool in TOOLS {
            fake.install(tool, &fake.passthrough_script());
        }
        fake
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn tools(&self) -> ToolPaths {
        ToolPaths {
            compiler: self.bin("clang++"),
            assembler: self.bin("llvm-as"),
            linker: self.bin("llvm-link"),
            codegen: self.bin("llc"),
        }
    }

    /// Document printed by the fake compiler for `-ast-dump=json`.
    pub(crate) fn set_ast(&self, json: &str) {
        fs::write(self.root().join("ast-fixture.json"), json).expect("write ast fixture");
    }

    /// Make `tool` log its call and exit with status 1.
    pub(crate) fn fail(&self, tool: &str) {
        let script = format!(
            "#!/bin/sh\necho \"$(basename \"$0\") $*\" >> \"{log}\"\necho \"{tool}: simulated failure\" >&2\nexit 1\n",
            log = self.log_path().display()
        );
        self.install(tool, &script);
    }

    /// Logged calls, in invocation order.
    pub(crate) fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn bin(&self, tool: &str) -> PathBuf {
        self.root().join("bin").join(tool)
    }

    fn log_path(&self) -> PathBuf {
        self.root().join("calls.log")
    }

    fn passthrough_script(&self) -> String {
        format!(
            r#"#!/bin/sh
echo "$(basename "$0") $*" >> "{log}"
out=""
prev=""
for arg in "$@"; do
    if [ "$arg" = "-ast-dump=json" ]; then
        cat "{fixture}"
        exit 0
    fi
    if [ "$prev" = "-o" ]; then
        out="$arg"
    fi
    prev="$arg"
done
[ -n "$out" ] || exit 2
: > "$out"
prev=""
for arg in "$@"; do
    if [ "$prev" != "-o" ] && [ "$arg" != "$out" ] && [ -f "$arg" ]; then
        cat "$arg" >> "$out"
    fi
    prev="$arg"
done
"#,
            log = self.log_path().display(),
            fixture = self.root().join("ast-fixture.json").display()
        )
    }

    fn install(&self, tool: &str, script: &str) {
        let path = self.bin(tool);
        fs::write(&path, script).expect("write fake tool");
        let mut permissions = fs::metadata(&path).expect("metadata").permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).expect("chmod fake tool");
    }
}
