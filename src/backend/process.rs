//! External process plumbing shared by every stage.
//!
//! Processes run synchronously with a deadline. Piped output is drained on background threads so a chatty
//! child can never block on a full pipe while we poll for its exit. The deadline also bounds collecting that
//! output: a descendant that inherited the pipes and outlives the child cannot hold the run open.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Minimum wait for a drain thread once the child has exited, even at the deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// A program plus the leading arguments it is always invoked with.
///
/// Parsed from a whitespace-separated command line such as `swift build` or `sh ./fake-cc.sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Split a command line on whitespace. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self {
            program: program.into(),
            args: words.map(OsString::from).collect(),
        })
    }

    /// Build a `Command` with the leading arguments applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Normal exit with a code.
    Exited(i32),
    /// Killed by a signal (the number, where the platform reports one).
    Signaled(Option<i32>),
    /// Still running at the deadline; the child was killed.
    TimedOut(Duration),
}

impl ProcessStatus {
    pub fn success(self) -> bool {
        matches!(self, ProcessStatus::Exited(0))
    }

    fn from_exit_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ProcessStatus::Exited(code),
            None => ProcessStatus::Signaled(signal_of(status)),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Exited(code) => write!(f, "exited with status {}", code),
            ProcessStatus::Signaled(Some(signal)) => write!(f, "terminated by signal {}", signal),
            ProcessStatus::Signaled(None) => write!(f, "terminated abnormally"),
            ProcessStatus::TimedOut(limit) => write!(f, "timed out after {:.1}s", limit.as_secs_f64()),
        }
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

/// Final status plus whatever the child wrote to piped streams.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ProcessStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `cmd` to completion or until `timeout` elapses.
///
/// Stdin is always null. Stdout/stderr are captured only if the caller configured them as piped; anything
/// else (a file, null, inherit) is left alone. Returns `Err` only when the process cannot be spawned or waited on.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<ProcessOutput> {
    tracing::debug!(command = ?cmd, timeout_ms = timeout.as_millis() as u64, "spawning");
    let mut child = cmd.stdin(Stdio::null()).spawn()?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(ProcessOutput {
                status: ProcessStatus::from_exit_status(status),
                stdout: collect(stdout, deadline),
                stderr: collect(stderr, deadline),
            });
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    tracing::debug!(pid = child.id(), "deadline reached, killing child");
    // The child may have exited between the last poll and now; either way it is reaped below.
    let _ = child.kill();
    child.wait()?;
    // Grandchildren may still hold the pipes open, so the drain threads are detached rather than joined.
    Ok(ProcessOutput {
        status: ProcessStatus::TimedOut(timeout),
        stdout: String::new(),
        stderr: String::new(),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        // A read error just truncates the captured text.
        let _ = reader.read_to_end(&mut buf);
        // The receiver is gone if collection already gave up.
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a drain thread until `deadline` (at least [`DRAIN_GRACE`]); past that the thread is abandoned.
fn collect(output: Option<Receiver<String>>, deadline: Instant) -> String {
    let Some(rx) = output else {
        return String::new();
    };
    let wait = deadline.saturating_duration_since(Instant::now()).max(DRAIN_GRACE);
    match rx.recv_timeout(wait) {
        Ok(text) => text,
        Err(_) => {
            tracing::debug!("output pipe still held open by a descendant, abandoning it");
            String::new()
        }
    }
}
