//! Provide the pure test-case semantics shared by the bcc test harness.
//!
//! This crate is intentionally small. It contains deterministic helpers that the harness uses to:
//! - classify a test source by its embedded directive (`// FAIL`, `// RETURN: <n>`),
//! - derive the build artifact paths for a test source,
//! - reduce a process exit code to the status compared against an expectation,
//! - aggregate pass/total counters for a run.
//!
//! ## Notes
//!
//! - **No IO** and no global mutable state: callers read files and spawn processes, this crate only decides.
//! - Path helpers manipulate `Path` values but never touch the filesystem.

pub mod artifacts;
pub mod directive;
pub mod status;
pub mod summary;

use std::fmt;
use std::path::{Path, PathBuf};

pub use artifacts::BuildArtifacts;
pub use directive::{DirectiveError, Expectation, FAIL_MARKER, parse_expectation};
pub use status::{ABNORMAL_STATUS, normalize_exit_code};
pub use summary::RunSummary;

/// One discovered test: a source file and what it is expected to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub source_path: PathBuf,
    pub expectation: Expectation,
}

impl TestCase {
    pub fn new(source_path: impl Into<PathBuf>, expectation: Expectation) -> Self {
        Self {
            source_path: source_path.into(),
            expectation,
        }
    }

    /// Classify `source` (the full text of the file at `path`).
    ///
    /// Returns `None` when the file carries no directive.
    pub fn from_source(path: &Path, source: &str) -> Option<Self> {
        parse_expectation(source).map(|expectation| Self::new(path, expectation))
    }

    /// Artifact paths derived from the source.
    pub fn artifacts(&self) -> BuildArtifacts {
        BuildArtifacts::for_source(&self.source_path)
    }

    /// The subset of [`Self::artifacts`] this test's pipeline can write, and therefore removes afterwards.
    ///
    /// An expected compile failure only ever produces the assembly file; a malformed test produces nothing.
    pub fn owned_artifacts(&self) -> Vec<PathBuf> {
        let artifacts = self.artifacts();
        match self.expectation {
            Expectation::ExitCode(_) => artifacts.paths().iter().map(|p| p.to_path_buf()).collect(),
            Expectation::CompileFailure => vec![artifacts.assembly],
            Expectation::Malformed(_) => Vec::new(),
        }
    }
}

/// The furthest point a test's pipeline reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Discovery,
    Compile,
    Assemble,
    Link,
    Run,
}

impl Stage {
    /// Noun used in failure lines (`FAILED (Assembly)`).
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Discovery => "Discovery",
            Stage::Compile => "Compilation",
            Stage::Assemble => "Assembly",
            Stage::Link => "Linking",
            Stage::Run => "Execution",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
