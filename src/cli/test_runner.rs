//! Test runner implementation
//!
//! Drives every discovered test through the build pipeline and decides pass/fail:
//!
//! ```text
//! Discovered → Compile → Assemble → Link → Run → {Passed, Failed}
//!                  └── (expected compile failure stops here)
//! ```
//!
//! Every test holds an [`ArtifactGuard`] for its `.s`/`.o`/executable paths while it runs. The guard deletes
//! them on drop, so cleanup happens on every exit path, early returns and panics included.
//!
//! ## TestReporter Trait
//!
//! Output goes through the `TestReporter` trait so orchestration stays free of printing. `ConsoleReporter` is
//! the default line-per-test console format.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bcctest_core::{BuildArtifacts, DirectiveError, Expectation, RunSummary, Stage, TestCase};
use thiserror::Error;

use super::test_interfaces::{TestError, TestExecutor, Toolchain};
use crate::backend::{ProcessOutput, ProcessStatus, RunOutcome};

// ============================================================================
// Results
// ============================================================================

/// Why a single test failed. `Display` is the text shown inside `FAILED (...)`.
#[derive(Debug, Error)]
pub enum TestFailure {
    /// A build stage ran and exited unsuccessfully.
    #[error("{stage}")]
    Stage { stage: Stage, diagnostics: String },

    #[error("{stage} timed out after {:.1}s", .timeout.as_secs_f64())]
    TimedOut { stage: Stage, timeout: Duration },

    /// A build stage could not be started at all.
    #[error("{stage}: {source}")]
    Harness {
        stage: Stage,
        #[source]
        source: TestError,
    },

    /// The directive cannot be satisfied, so nothing was built.
    #[error("Discovery: {0}")]
    Directive(#[source] DirectiveError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Expected {expected}, got {observed}")]
    Mismatch { expected: u8, observed: u8 },

    #[error("Expected Compilation Error, but succeeded")]
    UnexpectedCompileSuccess,
}

impl TestFailure {
    /// The stage this failure is attributed to.
    pub fn stage(&self) -> Stage {
        match self {
            TestFailure::Stage { stage, .. }
            | TestFailure::TimedOut { stage, .. }
            | TestFailure::Harness { stage, .. } => *stage,
            TestFailure::Directive(_) => Stage::Discovery,
            TestFailure::Execution(_) | TestFailure::Mismatch { .. } => Stage::Run,
            TestFailure::UnexpectedCompileSuccess => Stage::Compile,
        }
    }

    /// Captured stderr of the failing stage, if it said anything.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            TestFailure::Stage { diagnostics, .. } => {
                let text = diagnostics.trim_end();
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        }
    }

    /// Map a stage that ran but did not succeed.
    fn from_stage_output(stage: Stage, output: ProcessOutput) -> Self {
        match output.status {
            ProcessStatus::TimedOut(timeout) => TestFailure::TimedOut { stage, timeout },
            ProcessStatus::Exited(_) => TestFailure::Stage {
                stage,
                diagnostics: output.stderr,
            },
            status @ ProcessStatus::Signaled(_) => {
                let mut diagnostics = output.stderr;
                if !diagnostics.is_empty() && !diagnostics.ends_with('\n') {
                    diagnostics.push('\n');
                }
                diagnostics.push_str(&format!("{} {}", stage_tool(stage), status));
                TestFailure::Stage { stage, diagnostics }
            }
        }
    }
}

fn stage_tool(stage: Stage) -> &'static str {
    match stage {
        Stage::Compile => "compiler",
        Stage::Assemble => "assembler",
        Stage::Link => "linker",
        Stage::Discovery | Stage::Run => "program",
    }
}

#[derive(Debug)]
pub enum TestOutcome {
    Passed,
    /// An expected compilation failure that did fail.
    ExpectedFail,
    Failed(TestFailure),
}

/// Result of running a single test
#[derive(Debug)]
pub struct TestResult {
    /// Furthest stage attempted
    pub stage_reached: Stage,
    /// Status of the test program, when it was run (`-1` for abnormal termination)
    pub observed_code: Option<i32>,
    pub outcome: TestOutcome,
    pub duration: Duration,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        !matches!(self.outcome, TestOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&TestFailure> {
        match &self.outcome {
            TestOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Result word(s) shown after the progress line.
    pub fn message(&self) -> String {
        match &self.outcome {
            TestOutcome::Passed => "PASSED".to_string(),
            TestOutcome::ExpectedFail => "PASSED (Expected Fail)".to_string(),
            TestOutcome::Failed(failure) => format!("FAILED ({})", failure),
        }
    }
}

// ============================================================================
// Artifact cleanup
// ============================================================================

/// Owns the artifact paths a test may write and removes them when dropped.
///
/// Only paths the test's expectation can produce are owned (see [`TestCase::owned_artifacts`]), so an expected
/// compile failure never touches an `.o` or extensionless file next to its source. Each removal is independent: a
/// path that was never created is skipped, and a failed removal is logged without stopping the others.
pub struct ArtifactGuard {
    artifacts: BuildArtifacts,
    owned: Vec<PathBuf>,
}

impl ArtifactGuard {
    pub fn for_case(case: &TestCase) -> Self {
        Self {
            artifacts: case.artifacts(),
            owned: case.owned_artifacts(),
        }
    }

    pub fn artifacts(&self) -> &BuildArtifacts {
        &self.artifacts
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in &self.owned {
            remove_artifact(path);
        }
    }
}

fn remove_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::trace!(path = %path.display(), "removed artifact"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact"),
    }
}

// ============================================================================
// Single test
// ============================================================================

/// Run one test through the pipeline. Its artifacts are gone by the time this returns.
#[tracing::instrument(skip_all, fields(source = %case.source_path.display()))]
pub fn run_single_test(case: &TestCase, toolchain: &dyn Toolchain, executor: &dyn TestExecutor) -> TestResult {
    let start = Instant::now();
    let guard = ArtifactGuard::for_case(case);

    let (observed_code, outcome) = match &case.expectation {
        Expectation::CompileFailure => (None, expect_compile_failure(case, guard.artifacts(), toolchain)),
        Expectation::ExitCode(expected) => build_and_run(case, guard.artifacts(), *expected, toolchain, executor),
        Expectation::Malformed(error) => (None, TestOutcome::Failed(TestFailure::Directive(error.clone()))),
    };

    let stage_reached = match (&outcome, &case.expectation) {
        (TestOutcome::Failed(failure), _) => failure.stage(),
        (_, Expectation::CompileFailure) => Stage::Compile,
        (_, Expectation::ExitCode(_)) => Stage::Run,
        (_, Expectation::Malformed(_)) => Stage::Discovery,
    };
    drop(guard);

    let result = TestResult {
        stage_reached,
        observed_code,
        outcome,
        duration: start.elapsed(),
    };
    tracing::debug!(stage = %result.stage_reached, passed = result.passed(), "test finished");
    result
}

/// Any compile that does not succeed satisfies `// FAIL`: a non-zero exit, a crash, a timeout, or a compiler
/// that could not be started at all.
fn expect_compile_failure(case: &TestCase, artifacts: &BuildArtifacts, toolchain: &dyn Toolchain) -> TestOutcome {
    match toolchain.compile(&case.source_path, &artifacts.assembly) {
        Ok(output) if output.success() => TestOutcome::Failed(TestFailure::UnexpectedCompileSuccess),
        Ok(output) => {
            tracing::debug!(status = %output.status, "compiler rejected the source");
            TestOutcome::ExpectedFail
        }
        Err(source @ TestError::Spawn { .. }) => {
            tracing::debug!(error = %source, "compiler could not be started");
            TestOutcome::ExpectedFail
        }
        Err(source) => TestOutcome::Failed(TestFailure::Harness {
            stage: Stage::Compile,
            source,
        }),
    }
}

fn build_and_run(
    case: &TestCase,
    artifacts: &BuildArtifacts,
    expected: u8,
    toolchain: &dyn Toolchain,
    executor: &dyn TestExecutor,
) -> (Option<i32>, TestOutcome) {
    if let Err(failure) = build(case, artifacts, toolchain) {
        return (None, TestOutcome::Failed(failure));
    }

    let run = executor.execute(&artifacts.executable);
    let observed = Some(run.status());
    let outcome = match run {
        RunOutcome::Exited(code) if code == expected => TestOutcome::Passed,
        RunOutcome::Exited(code) => TestOutcome::Failed(TestFailure::Mismatch {
            expected,
            observed: code,
        }),
        RunOutcome::Abnormal(reason) => TestOutcome::Failed(TestFailure::Execution(reason)),
    };
    (observed, outcome)
}

/// Compile, assemble and link, stopping at the first stage that does not succeed.
fn build(case: &TestCase, artifacts: &BuildArtifacts, toolchain: &dyn Toolchain) -> Result<(), TestFailure> {
    check_stage(Stage::Compile, toolchain.compile(&case.source_path, &artifacts.assembly))?;
    check_stage(Stage::Assemble, toolchain.assemble(&artifacts.assembly, &artifacts.object))?;
    check_stage(Stage::Link, toolchain.link(&artifacts.object, &artifacts.executable))
}

fn check_stage(stage: Stage, result: Result<ProcessOutput, TestError>) -> Result<(), TestFailure> {
    let output = result.map_err(|source| TestFailure::Harness { stage, source })?;
    if output.success() {
        Ok(())
    } else {
        Err(TestFailure::from_stage_output(stage, output))
    }
}

// ============================================================================
// Whole run
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after the first failing test
    pub stop_on_fail: bool,
    /// Only run tests whose path contains this text
    pub filter: Option<String>,
}

/// Run `cases` in order and return the pass/total counts.
///
/// Tests excluded by the filter are not counted. With `stop_on_fail`, tests after the first failure are not
/// counted either.
pub fn run_tests(
    cases: Vec<TestCase>,
    options: &RunOptions,
    toolchain: &dyn Toolchain,
    executor: &dyn TestExecutor,
    reporter: &mut dyn TestReporter,
) -> RunSummary {
    let start = Instant::now();

    let cases: Vec<TestCase> = match options.filter.as_deref() {
        Some(keyword) => cases
            .into_iter()
            .filter(|case| case.source_path.to_string_lossy().contains(keyword))
            .collect(),
        None => cases,
    };

    let total = cases.len();
    reporter.on_collection_complete(total);

    let mut summary = RunSummary::default();
    for (i, case) in cases.iter().enumerate() {
        reporter.on_test_start(i + 1, total, case);
        let result = run_single_test(case, toolchain, executor);
        reporter.on_test_complete(case, &result);
        summary.record(result.passed());

        if options.stop_on_fail && !result.passed() {
            break;
        }
    }

    reporter.on_run_complete(&summary, start.elapsed());
    summary
}

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting test execution progress and results.
pub trait TestReporter {
    /// Called once, after filtering, with the number of tests that will run
    fn on_collection_complete(&mut self, test_count: usize);

    /// Called before a test runs (`index` is 1-based)
    fn on_test_start(&mut self, index: usize, total: usize, case: &TestCase);

    /// Called when a test completes
    fn on_test_complete(&mut self, case: &TestCase, result: &TestResult);

    /// Called when all tests have completed
    fn on_run_complete(&mut self, summary: &RunSummary, elapsed: Duration);
}

/// Default console reporter: one progress+result line per test, then a summary
pub struct ConsoleReporter {
    pub verbose: bool,
    pub color: bool,
}

impl ConsoleReporter {
    /// Color is enabled only when stdout is a terminal.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            color: io::stdout().is_terminal(),
        }
    }

    fn paint(&self, text: &str, ansi: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", ansi, text)
        } else {
            text.to_string()
        }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, test_count: usize) {
        if test_count == 0 {
            println!("No tests found.");
        }
    }

    fn on_test_start(&mut self, index: usize, total: usize, case: &TestCase) {
        print!("{} ", format_progress(index, total, case));
        // Progress should be visible while a slow stage runs.
        let _ = io::stdout().flush();
    }

    fn on_test_complete(&mut self, _case: &TestCase, result: &TestResult) {
        let line = format_result(result, self.verbose);
        let ansi = match result.outcome {
            TestOutcome::Passed => "32",
            TestOutcome::ExpectedFail => "33",
            TestOutcome::Failed(_) => "31",
        };
        println!("{}", self.paint(&line, ansi));

        if let Some(diagnostics) = result.failure().and_then(TestFailure::diagnostics) {
            println!("{}", diagnostics);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary, elapsed: Duration) {
        let elapsed = self.verbose.then_some(elapsed);
        let line = format_summary(summary, elapsed);
        let ansi = if summary.all_passed() { "1;32" } else { "1;31" };
        println!();
        println!("{}", self.paint(&line, ansi));
    }
}

/// `[3/10] Testing tests/stage_1/ret.c...`
pub fn format_progress(index: usize, total: usize, case: &TestCase) -> String {
    format!("[{}/{}] Testing {}...", index, total, case.source_path.display())
}

/// `PASSED`, `PASSED (Expected Fail)` or `FAILED (<reason>)`, with the duration in verbose mode.
pub fn format_result(result: &TestResult, verbose: bool) -> String {
    let message = result.message();
    if verbose {
        format!("{} [{}ms]", message, result.duration.as_millis())
    } else {
        message
    }
}

/// `Summary: 3/4 tests passed.`
pub fn format_summary(summary: &RunSummary, elapsed: Option<Duration>) -> String {
    match elapsed {
        Some(elapsed) => format!(
            "Summary: {}/{} tests passed in {:.2}s.",
            summary.passed,
            summary.total,
            elapsed.as_secs_f64()
        ),
        None => format!("Summary: {}/{} tests passed.", summary.passed, summary.total),
    }
}

// ============================================================================
// Tests
// ============================================================================
