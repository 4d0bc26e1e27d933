//! CLI module for the bcc test harness
//!
//! Running `bcctest` with no arguments builds the compiler, scans `tests/` and runs every test it finds.
//! All flags only override defaults (see [`crate::config::HarnessConfig`]).
//!
//! ## Modules
//!
//! - `commands` - Upstream build and suite execution
//! - `test_interfaces` - Discovery/toolchain/executor traits and their default implementations
//! - `test_runner` - Per-test pipeline, cleanup, reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod test_interfaces;
pub mod test_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use miette::Diagnostic;
use thiserror::Error;

use crate::backend::ToolCommand;
use crate::config::{
    DEFAULT_ARCH, DEFAULT_ASSEMBLER, DEFAULT_BUILD_COMMAND, DEFAULT_COMPILER, DEFAULT_LINKER,
    DEFAULT_RUN_TIMEOUT_SECS, DEFAULT_SOURCE_EXTENSION, DEFAULT_STAGE_TIMEOUT_SECS, DEFAULT_TEST_ROOT, HarnessConfig,
};
use crate::version::BCCTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that abort the whole run before any test is attempted.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("Compiler build failed.")]
    #[diagnostic(code(bcctest::upstream_build))]
    UpstreamBuild {
        #[help]
        advice: String,
    },
}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        CliError::failure(format!("{:?}", miette::Report::new(err)))
    }
}

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Build-and-execute test harness for the bcc compiler
///
/// Test sources declare their expectation in a comment: `// RETURN: <n>` (build, run, expect exit code n)
/// or `// FAIL` (the compiler must reject the file).
#[derive(Parser, Debug)]
#[command(name = "bcctest")]
#[command(version = BCCTEST_VERSION)]
#[command(about = "Build-and-execute test harness for the bcc compiler")]
pub struct Cli {
    /// Directory scanned recursively for test sources
    #[arg(value_name = "ROOT", default_value = DEFAULT_TEST_ROOT)]
    pub root: PathBuf,

    /// Compiler under test (command line; receives the source path, prints assembly)
    #[arg(long, value_name = "CMD", default_value = DEFAULT_COMPILER)]
    pub compiler: String,

    /// Assembler command
    #[arg(long, value_name = "CMD", default_value = DEFAULT_ASSEMBLER)]
    pub assembler: String,

    /// Linker driver command
    #[arg(long, value_name = "CMD", default_value = DEFAULT_LINKER)]
    pub linker: String,

    /// Target architecture passed as `-arch`
    #[arg(long, value_name = "ARCH", default_value = DEFAULT_ARCH)]
    pub arch: String,

    /// Test source extension
    #[arg(long = "ext", value_name = "EXT", default_value = DEFAULT_SOURCE_EXTENSION)]
    pub extension: String,

    /// Command that builds the compiler before testing
    #[arg(long = "build-cmd", value_name = "CMD", default_value = DEFAULT_BUILD_COMMAND)]
    pub build_cmd: String,

    /// Skip building the compiler
    #[arg(long = "no-build")]
    pub no_build: bool,

    /// Per-stage timeout for compile, assemble and link, in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_STAGE_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Timeout for running each built test program, in seconds
    #[arg(long = "run-timeout", value_name = "SECS", default_value_t = DEFAULT_RUN_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub run_timeout: u64,

    /// Stop on first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub stop_on_fail: bool,

    /// Only run tests whose path contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,

    /// Show per-test durations and total run time
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Turn parsed arguments into a [`HarnessConfig`].
    pub fn into_config(self) -> CliResult<HarnessConfig> {
        let build_command = if self.no_build {
            None
        } else {
            Some(tool("--build-cmd", &self.build_cmd)?)
        };

        Ok(HarnessConfig {
            test_root: self.root,
            extension: self.extension.trim_start_matches('.').to_string(),
            compiler: tool("--compiler", &self.compiler)?,
            assembler: tool("--assembler", &self.assembler)?,
            linker: tool("--linker", &self.linker)?,
            arch: self.arch,
            build_command,
            stage_timeout: Duration::from_secs(self.timeout),
            run_timeout: Duration::from_secs(self.run_timeout),
            stop_on_fail: self.stop_on_fail,
            filter: self.filter,
            verbose: self.verbose,
            ..HarnessConfig::default()
        })
    }
}

fn tool(flag: &str, line: &str) -> CliResult<ToolCommand> {
    ToolCommand::parse(line).ok_or_else(|| CliError::failure(format!("Error: {} must not be empty", flag)))
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.into_config()?;
    commands::run_suite(&config)
}

// ============================================================================
// Tests
// ============================================================================
