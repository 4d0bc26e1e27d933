//! External process backend for the harness.
//!
//! ## Module Organization
//!
//! - `process.rs` - Spawning with deadlines, output capture, `ToolCommand`
//! - `toolchain.rs` - Compile/assemble/link stages, SDK lookup, upstream compiler build
//! - `outcome.rs` - Running a built test program and interpreting its termination

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod outcome;
pub mod process;
pub mod toolchain;

pub use outcome::{RunOutcome, run_executable};
pub use process::{ProcessOutput, ProcessStatus, ToolCommand};
pub use toolchain::{ToolchainConfig, ToolchainInvoker};
