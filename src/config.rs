//! Harness configuration.
//!
//! Built once from the command line; every field has a default so a bare `bcctest` reproduces the standard run.

use std::path::PathBuf;
use std::time::Duration;

use crate::backend::toolchain::{ToolchainConfig, query_sdk_root};
use crate::backend::ToolCommand;

pub const DEFAULT_TEST_ROOT: &str = "tests";
pub const DEFAULT_COMPILER: &str = ".build/debug/bcc";
pub const DEFAULT_ASSEMBLER: &str = "as";
pub const DEFAULT_LINKER: &str = "clang";
pub const DEFAULT_ARCH: &str = "x86_64";
pub const DEFAULT_SOURCE_EXTENSION: &str = "c";
pub const DEFAULT_BUILD_COMMAND: &str = "swift build";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 10;

/// Upper bound for the one-shot SDK query.
const SDK_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory scanned (recursively) for test sources
    pub test_root: PathBuf,
    /// Source file extension, without the dot
    pub extension: String,
    /// Compiler under test; receives the source path, prints assembly
    pub compiler: ToolCommand,
    pub assembler: ToolCommand,
    pub linker: ToolCommand,
    /// Target architecture passed as `-arch`
    pub arch: String,
    /// Command that builds the compiler before any test runs; `None` skips the build
    pub build_command: Option<ToolCommand>,
    /// Command printing the platform SDK root; `None` never passes `-isysroot`
    pub sdk_query: Option<ToolCommand>,
    /// Deadline for each build stage
    pub stage_timeout: Duration,
    /// Deadline for running a built test program
    pub run_timeout: Duration,
    /// Stop after the first failing test
    pub stop_on_fail: bool,
    /// Only run tests whose path contains this text
    pub filter: Option<String>,
    /// Show per-test durations and total run time
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            test_root: PathBuf::from(DEFAULT_TEST_ROOT),
            extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            compiler: ToolCommand::new(DEFAULT_COMPILER),
            assembler: ToolCommand::new(DEFAULT_ASSEMBLER),
            linker: ToolCommand::new(DEFAULT_LINKER),
            arch: DEFAULT_ARCH.to_string(),
            build_command: ToolCommand::parse(DEFAULT_BUILD_COMMAND),
            sdk_query: default_sdk_query(),
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            stop_on_fail: false,
            filter: None,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    /// Resolve the toolchain settings, running the SDK query exactly once.
    pub fn resolve_toolchain(&self) -> ToolchainConfig {
        let sdk_root = self
            .sdk_query
            .as_ref()
            .and_then(|query| query_sdk_root(query, SDK_QUERY_TIMEOUT));

        ToolchainConfig {
            compiler: self.compiler.clone(),
            assembler: self.assembler.clone(),
            linker: self.linker.clone(),
            arch: self.arch.clone(),
            sdk_root,
            stage_timeout: self.stage_timeout,
        }
    }
}

/// `xcrun` only exists on macOS; elsewhere there is no SDK root to pass.
fn default_sdk_query() -> Option<ToolCommand> {
    if cfg!(target_os = "macos") {
        Some(ToolCommand::new("xcrun").arg("--show-sdk-path"))
    } else {
        None
    }
}
