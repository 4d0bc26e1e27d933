//! Shared fixtures for integration tests: a fake bcc toolchain made of POSIX shell scripts.
//!
//! The fake compiler turns a C file into a tiny shell program ("assembly"), the assembler copies it, and the
//! linker prepends a shebang and marks it executable. Behavior is steered from the test source:
//!
//! - `crash compiler` anywhere → the compiler kills itself with SIGSEGV
//! - `syntax error` anywhere → the compiler rejects the file
//! - lines starting with `//! ` → emitted verbatim as the program body
//! - otherwise the first `return N;` becomes `exit N`
//! - a body containing `malformed` → the assembler rejects it
//! - a body containing `unresolved` → the linker rejects it

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bcctest::backend::{ToolCommand, ToolchainConfig};
use bcctest::{RunSummary, TestCase, TestReporter, TestResult};

const COMPILER: &str = r#"#!/bin/sh
src="$1"
if grep -q 'crash compiler' "$src"; then
    kill -11 $$
fi
if grep -q 'syntax error' "$src"; then
    echo "$src:1: error: expected ';'" >&2
    exit 1
fi
raw=$(sed -n 's|^//! ||p' "$src")
if [ -n "$raw" ]; then
    printf '%s\n' "$raw"
    exit 0
fi
code=$(sed -n 's/.*return \([0-9][0-9]*\);.*/\1/p' "$src" | head -n 1)
echo "exit ${code:-0}"
"#;

const ASSEMBLER: &str = r#"#!/bin/sh
if grep -q 'malformed' "$3"; then
    echo "$3: error: unknown instruction" >&2
    exit 1
fi
cp "$3" "$5"
"#;

const LINKER: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/linker.args"
eval "obj=\${$(($# - 2))}"
eval "exe=\${$#}"
if grep -q 'unresolved' "$obj"; then
    echo "ld: undefined symbol: _main" >&2
    exit 1
fi
{ echo '#!/bin/sh'; cat "$obj"; } > "$exe"
chmod +x "$exe"
"#;

/// A temp directory holding the fake tools and a `tests/` root.
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tools = dir.path().join("tools");
        fs::create_dir_all(&tools).unwrap();
        fs::write(tools.join("compiler.sh"), COMPILER).unwrap();
        fs::write(tools.join("assembler.sh"), ASSEMBLER).unwrap();
        fs::write(tools.join("linker.sh"), LINKER).unwrap();
        fs::create_dir_all(dir.path().join("tests")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("tests")
    }

    /// Scripts are run through `sh` so they never need the executable bit.
    pub fn tool_line(&self, name: &str) -> String {
        format!("sh {}", self.dir.path().join("tools").join(name).display())
    }

    pub fn toolchain(&self) -> ToolchainConfig {
        ToolchainConfig {
            compiler: ToolCommand::parse(&self.tool_line("compiler.sh")).unwrap(),
            assembler: ToolCommand::parse(&self.tool_line("assembler.sh")).unwrap(),
            linker: ToolCommand::parse(&self.tool_line("linker.sh")).unwrap(),
            arch: "x86_64".to_string(),
            sdk_root: None,
            stage_timeout: Duration::from_secs(20),
        }
    }

    pub fn linker_args(&self) -> String {
        fs::read_to_string(self.dir.path().join("tools").join("linker.args")).unwrap()
    }

    /// Write a test source relative to the test root.
    pub fn add(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }
}

pub fn assert_no_artifacts(source: &Path) {
    let case = TestCase::new(source, bcctest::Expectation::CompileFailure);
    for path in case.artifacts().paths() {
        assert!(!path.exists(), "artifact left behind: {}", path.display());
    }
    assert!(source.exists(), "source removed: {}", source.display());
}

/// Reporter that keeps every result for inspection.
#[derive(Default)]
pub struct Recorder {
    pub collected: Option<usize>,
    pub results: Vec<(PathBuf, String, Option<i32>, Option<String>)>,
    pub summary: Option<RunSummary>,
}

impl Recorder {
    pub fn message_for(&self, source: &Path) -> &str {
        self.results
            .iter()
            .find(|(path, ..)| path == source)
            .map(|(_, message, ..)| message.as_str())
            .unwrap_or_else(|| panic!("no result for {}", source.display()))
    }
}

impl TestReporter for Recorder {
    fn on_collection_complete(&mut self, test_count: usize) {
        self.collected = Some(test_count);
    }

    fn on_test_start(&mut self, _index: usize, _total: usize, _case: &TestCase) {}

    fn on_test_complete(&mut self, case: &TestCase, result: &TestResult) {
        let diagnostics = result.failure().and_then(|f| f.diagnostics()).map(str::to_string);
        self.results
            .push((case.source_path.clone(), result.message(), result.observed_code, diagnostics));
    }

    fn on_run_complete(&mut self, summary: &RunSummary, _elapsed: Duration) {
        self.summary = Some(*summary);
    }
}
