//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use crate::backend::toolchain::build_compiler;
use crate::backend::{ToolCommand, ToolchainInvoker};
use crate::config::HarnessConfig;

use super::test_interfaces::{DefaultTestDiscovery, DefaultTestExecutor, TestDiscovery};
use super::test_runner::{ConsoleReporter, RunOptions, run_tests};
use super::{CliResult, ExitCode, HarnessError};

/// Build the compiler (unless disabled), discover tests, run them, and map the summary to an exit code.
pub fn run_suite(config: &HarnessConfig) -> CliResult<ExitCode> {
    if let Some(build) = &config.build_command {
        println!("Building compiler...");
        build_upstream(build)?;
    }

    // One SDK lookup for the whole run.
    let toolchain_config = config.resolve_toolchain();

    // An unreadable root yields no tests rather than aborting the run.
    let cases = DefaultTestDiscovery::new(&config.extension)
        .discover(&config.test_root)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "test discovery failed, treating the root as empty");
            Vec::new()
        });

    let toolchain = ToolchainInvoker::new(&toolchain_config);
    let executor = DefaultTestExecutor::new(config.run_timeout);
    let options = RunOptions {
        stop_on_fail: config.stop_on_fail,
        filter: config.filter.clone(),
    };
    let mut reporter = ConsoleReporter::new(config.verbose);

    let summary = run_tests(cases, &options, &toolchain, &executor, &mut reporter);
    Ok(ExitCode(summary.exit_status()))
}

fn build_upstream(build: &ToolCommand) -> Result<(), HarnessError> {
    let reason = match build_compiler(build) {
        Ok(true) => return Ok(()),
        Ok(false) => "exited unsuccessfully".to_string(),
        Err(e) => format!("could not be started ({})", e),
    };
    Err(HarnessError::UpstreamBuild {
        advice: format!("`{}` {}; pass --no-build to skip it", build, reason),
    })
}
