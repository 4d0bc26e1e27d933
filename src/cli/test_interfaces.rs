//! Test runner I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the key test runner operations:
//! - Test discovery (filesystem scan + directive parsing)
//! - Toolchain stages (compile, assemble, link)
//! - Test execution (running the built program)
//!
//! The orchestration in `test_runner.rs` only talks to these traits, so it can be driven by fakes in tests and
//! by a different execution strategy later without changing pass/fail logic.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bcctest_core::TestCase;
use thiserror::Error;
use walkdir::WalkDir;

use crate::backend::{ProcessOutput, RunOutcome, ToolCommand, ToolchainInvoker, run_executable};

/// Errors that occur at the I/O boundary of the test runner
#[derive(Debug, Error)]
pub enum TestError {
    #[error("failed to scan {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to create {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Test Discovery Interface
// ============================================================================

/// Find test cases under a root directory.
pub trait TestDiscovery {
    /// Return every classified test under `root`, ordered by path.
    ///
    /// A missing root yields an empty list, not an error.
    fn discover(&self, root: &Path) -> Result<Vec<TestCase>, TestError>;
}

// ============================================================================
// Toolchain Interface
// ============================================================================

/// The three external build stages.
///
/// `Err` means the stage could not even start (spawn failure, unwritable artifact); a stage that ran and failed
/// is an `Ok` with a non-success status.
pub trait Toolchain {
    fn compile(&self, source: &Path, assembly: &Path) -> Result<ProcessOutput, TestError>;
    fn assemble(&self, assembly: &Path, object: &Path) -> Result<ProcessOutput, TestError>;
    fn link(&self, object: &Path, executable: &Path) -> Result<ProcessOutput, TestError>;
}

// ============================================================================
// Test Executor Interface
// ============================================================================

/// Run a built test program.
pub trait TestExecutor {
    fn execute(&self, executable: &Path) -> RunOutcome;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Recursive filesystem discovery of `*.<extension>` files.
pub struct DefaultTestDiscovery {
    extension: String,
}

impl DefaultTestDiscovery {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn is_eligible(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension.as_str())
    }
}

impl TestDiscovery for DefaultTestDiscovery {
    #[tracing::instrument(skip_all, fields(root = %root.display()))]
    fn discover(&self, root: &Path) -> Result<Vec<TestCase>, TestError> {
        if !root.exists() {
            tracing::debug!("test root does not exist");
            return Ok(Vec::new());
        }

        let mut cases = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth() == 0 => {
                    return Err(TestError::Walk {
                        root: root.to_path_buf(),
                        source,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_eligible(entry.path()) {
                continue;
            }

            let path = entry.path();
            let source = match fs::read(path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable test source");
                    continue;
                }
            };

            match TestCase::from_source(path, &source) {
                Some(case) => cases.push(case),
                None => tracing::debug!(path = %path.display(), "no directive, skipping"),
            }
        }

        // Byte order of the full path keeps the listing stable across platforms and walk orders.
        cases.sort_by(|a, b| a.source_path.as_os_str().cmp(b.source_path.as_os_str()));
        tracing::debug!(count = cases.len(), "discovery complete");
        Ok(cases)
    }
}

impl Toolchain for ToolchainInvoker<'_> {
    fn compile(&self, source: &Path, assembly: &Path) -> Result<ProcessOutput, TestError> {
        let asm_file = File::create(assembly).map_err(|source| TestError::Artifact {
            path: assembly.to_path_buf(),
            source,
        })?;
        self.run_compiler(source, asm_file)
            .map_err(|source| spawn_error(&self.config().compiler, source))
    }

    fn assemble(&self, assembly: &Path, object: &Path) -> Result<ProcessOutput, TestError> {
        self.run_assembler(assembly, object)
            .map_err(|source| spawn_error(&self.config().assembler, source))
    }

    fn link(&self, object: &Path, executable: &Path) -> Result<ProcessOutput, TestError> {
        self.run_linker(object, executable)
            .map_err(|source| spawn_error(&self.config().linker, source))
    }
}

fn spawn_error(tool: &ToolCommand, source: io::Error) -> TestError {
    TestError::Spawn {
        program: tool.to_string(),
        source,
    }
}

/// Runs built programs directly with a deadline.
pub struct DefaultTestExecutor {
    timeout: Duration,
}

impl DefaultTestExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl TestExecutor for DefaultTestExecutor {
    fn execute(&self, executable: &Path) -> RunOutcome {
        run_executable(executable, self.timeout)
    }
}
