#![forbid(unsafe_code)]
//! bcctest: build-and-execute test harness for the bcc compiler
//!
//! Discovers C test sources carrying a `// RETURN: <n>` or `// FAIL` directive, drives the external toolchain
//! (compiler → assembler → linker) for each, runs the result and compares its exit status with the directive.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `backend` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: use `.expect("INVARIANT: reason")` with a clear explanation.

pub mod backend;
pub mod cli;
pub mod config;
pub mod version;

pub use bcctest_core::{BuildArtifacts, Expectation, RunSummary, Stage, TestCase};

pub use cli::test_interfaces::{DefaultTestDiscovery, DefaultTestExecutor, TestDiscovery, TestExecutor, Toolchain};
pub use cli::test_runner::{RunOptions, TestOutcome, TestReporter, TestResult, run_single_test, run_tests};
pub use config::HarnessConfig;
