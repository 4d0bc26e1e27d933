//! Outcome interpreter: run a built test program and reduce its termination to one status.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use bcctest_core::{ABNORMAL_STATUS, normalize_exit_code};

use super::process::{ProcessStatus, run_with_timeout};

/// What happened when a test program ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Normal exit; the code is already reduced to 8 bits.
    Exited(u8),
    /// Signal, timeout, or spawn failure, with a human-readable reason.
    Abnormal(String),
}

impl RunOutcome {
    /// Status comparable against an expected code; [`ABNORMAL_STATUS`] for anything but a normal exit.
    pub fn status(&self) -> i32 {
        match self {
            RunOutcome::Exited(code) => i32::from(*code),
            RunOutcome::Abnormal(_) => ABNORMAL_STATUS,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Exited(code) => write!(f, "exited with {}", code),
            RunOutcome::Abnormal(reason) => f.write_str(reason),
        }
    }
}

/// Run `executable` with no arguments.
///
/// The program's stdout/stderr are captured and dropped so they never interleave with the report.
pub fn run_executable(executable: &Path, timeout: Duration) -> RunOutcome {
    let mut cmd = Command::new(invocation_path(executable));
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    match run_with_timeout(&mut cmd, timeout) {
        Ok(output) => match output.status {
            ProcessStatus::Exited(code) => RunOutcome::Exited(normalize_exit_code(code)),
            status => RunOutcome::Abnormal(format!("program {}", status)),
        },
        Err(e) => RunOutcome::Abnormal(format!("cannot run {}: {}", executable.display(), e)),
    }
}

/// A bare relative name would be looked up on `PATH`; anchor it to the working directory instead.
fn invocation_path(executable: &Path) -> PathBuf {
    if executable.is_relative() {
        Path::new(".").join(executable)
    } else {
        executable.to_path_buf()
    }
}
