//! Test directives embedded in source comments.
//!
//! - `// FAIL` anywhere in the file: the compiler must reject the source.
//! - `// RETURN: <digits>`: the built program must exit with that code.
//!
//! The failure marker is an exact substring match and wins over a `RETURN` directive in the same file. A `RETURN`
//! value no process can exit with still makes the file a test; it is classified as [`Expectation::Malformed`]
//! and fails without being built.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Exact text that marks a test as an expected compilation failure.
pub const FAIL_MARKER: &str = "// FAIL";

static RETURN_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"//\s*RETURN:\s*([0-9]+)").expect("INVARIANT: RETURN directive pattern is valid")
});

/// What a test source expects from the toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expectation {
    /// The compile stage must exit non-zero; nothing further runs.
    CompileFailure,
    /// The program must build and terminate with this exit code.
    ExitCode(u8),
    /// A directive was found but cannot be satisfied; the test fails at discovery.
    Malformed(DirectiveError),
}

impl Expectation {
    pub fn expects_failure(&self) -> bool {
        matches!(self, Expectation::CompileFailure)
    }

    pub fn expected_exit_code(&self) -> Option<u8> {
        match self {
            Expectation::ExitCode(code) => Some(*code),
            Expectation::CompileFailure | Expectation::Malformed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum DirectiveError {
    #[error("RETURN directive value {0} is outside the exit-code range 0..=255")]
    OutOfRange(String),
}

/// Classify a test source by its directive.
///
/// Returns `None` for files without any directive (helpers, headers), which callers skip.
pub fn parse_expectation(source: &str) -> Option<Expectation> {
    if source.contains(FAIL_MARKER) {
        return Some(Expectation::CompileFailure);
    }

    let caps = RETURN_DIRECTIVE.captures(source)?;
    let digits = &caps[1];
    Some(match digits.parse::<u8>() {
        Ok(code) => Expectation::ExitCode(code),
        Err(_) => Expectation::Malformed(DirectiveError::OutOfRange(digits.to_string())),
    })
}
