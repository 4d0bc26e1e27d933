//! Toolchain invoker: compiler → assembler → linker.
//!
//! Each stage is one external process whose exit status gates the next stage. The invoker only runs
//! processes and reports their status; it never deletes artifacts (the test runner owns cleanup).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use super::process::{ProcessOutput, ToolCommand, run_with_timeout};

/// Everything the stages need, resolved once per run and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub compiler: ToolCommand,
    pub assembler: ToolCommand,
    pub linker: ToolCommand,
    /// Value for `-arch` on the assembler and linker.
    pub arch: String,
    /// Platform SDK root for `-isysroot`; omitted from the link line when `None`.
    pub sdk_root: Option<PathBuf>,
    /// Deadline for each of compile, assemble and link.
    pub stage_timeout: Duration,
}

/// Runs the three build stages described by a [`ToolchainConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ToolchainInvoker<'a> {
    config: &'a ToolchainConfig,
}

impl<'a> ToolchainInvoker<'a> {
    pub fn new(config: &'a ToolchainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolchainConfig {
        self.config
    }

    /// `<compiler> <source> > <assembly>`
    ///
    /// The caller creates `asm_file`, so the assembly artifact exists even when the compiler fails.
    pub fn run_compiler(&self, source: &Path, asm_file: File) -> io::Result<ProcessOutput> {
        let mut cmd = self.config.compiler.command();
        cmd.arg(source).stdout(Stdio::from(asm_file)).stderr(Stdio::piped());
        run_with_timeout(&mut cmd, self.config.stage_timeout)
    }

    /// `<assembler> -arch <arch> <assembly> -o <object>`
    pub fn run_assembler(&self, assembly: &Path, object: &Path) -> io::Result<ProcessOutput> {
        let mut cmd = self.config.assembler.command();
        cmd.arg("-arch")
            .arg(&self.config.arch)
            .arg(assembly)
            .arg("-o")
            .arg(object)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_with_timeout(&mut cmd, self.config.stage_timeout)
    }

    /// `<linker> -arch <arch> [-isysroot <sdk>] <object> -o <executable>`
    pub fn run_linker(&self, object: &Path, executable: &Path) -> io::Result<ProcessOutput> {
        let mut cmd = self.config.linker.command();
        cmd.arg("-arch").arg(&self.config.arch);
        if let Some(sdk) = &self.config.sdk_root {
            cmd.arg("-isysroot").arg(sdk);
        }
        cmd.arg(object)
            .arg("-o")
            .arg(executable)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_with_timeout(&mut cmd, self.config.stage_timeout)
    }
}

/// Ask the platform for its SDK root (`xcrun --show-sdk-path` on macOS).
///
/// Any failure (missing tool, non-zero exit, empty output, timeout) yields `None`: the link line simply omits
/// `-isysroot`.
pub fn query_sdk_root(query: &ToolCommand, timeout: Duration) -> Option<PathBuf> {
    let mut cmd = query.command();
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    match run_with_timeout(&mut cmd, timeout) {
        Ok(output) if output.success() => {
            let path = output.stdout.trim();
            if path.is_empty() {
                tracing::debug!(%query, "SDK query printed nothing");
                None
            } else {
                tracing::debug!(sdk = path, "resolved SDK root");
                Some(PathBuf::from(path))
            }
        }
        Ok(output) => {
            tracing::debug!(%query, status = %output.status, "SDK query failed");
            None
        }
        Err(e) => {
            tracing::debug!(%query, error = %e, "SDK query unavailable");
            None
        }
    }
}

/// Build the compiler under test with inherited stdio so its progress is visible.
///
/// Returns `Ok(false)` when the build command ran but failed.
pub fn build_compiler(build: &ToolCommand) -> io::Result<bool> {
    tracing::debug!(command = %build, "building compiler");
    let status = build.command().stdin(Stdio::null()).status()?;
    Ok(status.success())
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::process::ProcessStatus;

    fn config(compiler: &str, assembler: &str, linker: &str) -> ToolchainConfig {
        ToolchainConfig {
            compiler: ToolCommand::parse(compiler).unwrap(),
            assembler: ToolCommand::parse(assembler).unwrap(),
            linker: ToolCommand::parse(linker).unwrap(),
            arch: "x86_64".to_string(),
            sdk_root: None,
            stage_timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn compile_redirects_stdout_into_assembly() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("t.c");
        std::fs::write(&source, "int main(){return 0;}").unwrap();
        let asm = dir.path().join("t.s");

        // `cat` stands in for a compiler that echoes its input as "assembly".
        let cfg = config("cat", "true", "true");
        let asm_file = File::create(&asm).unwrap();
        let output = ToolchainInvoker::new(&cfg).run_compiler(&source, asm_file).unwrap();
        assert!(output.success());
        assert_eq!(std::fs::read_to_string(&asm).unwrap(), "int main(){return 0;}");
    }

    #[test]
    fn compile_captures_stderr_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("t.c");
        std::fs::write(&source, "").unwrap();
        let asm = dir.path().join("t.s");

        let cfg = config("cat", "true", "true");
        let missing = dir.path().join("missing.c");
        let output = ToolchainInvoker::new(&cfg)
            .run_compiler(&missing, File::create(&asm).unwrap())
            .unwrap();
        assert!(matches!(output.status, ProcessStatus::Exited(code) if code != 0));
        assert!(output.stderr.contains("missing.c"));
    }

    #[test]
    fn link_line_includes_sdk_only_when_known() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config("true", "true", "echo");
        let obj = dir.path().join("t.o");
        let exe = dir.path().join("t");

        let output = ToolchainInvoker::new(&cfg).run_linker(&obj, &exe).unwrap();
        assert!(!output.stdout.contains("-isysroot"));
        assert!(output.stdout.starts_with("-arch x86_64 "));

        cfg.sdk_root = Some(PathBuf::from("/opt/sdk"));
        let output = ToolchainInvoker::new(&cfg).run_linker(&obj, &exe).unwrap();
        assert!(output.stdout.contains("-isysroot /opt/sdk"));
    }

    #[test]
    fn sdk_query_trims_output() {
        let query = ToolCommand::parse("echo /opt/sdk").unwrap();
        assert_eq!(query_sdk_root(&query, Duration::from_secs(5)), Some(PathBuf::from("/opt/sdk")));
    }

    #[test]
    fn sdk_query_failures_are_none() {
        let failing = ToolCommand::parse("false").unwrap();
        assert_eq!(query_sdk_root(&failing, Duration::from_secs(5)), None);

        let missing = ToolCommand::new("/nonexistent/xcrun");
        assert_eq!(query_sdk_root(&missing, Duration::from_secs(5)), None);

        let silent = ToolCommand::new("true");
        assert_eq!(query_sdk_root(&silent, Duration::from_secs(5)), None);
    }

    #[test]
    fn build_compiler_reports_status() {
        assert!(build_compiler(&ToolCommand::new("true")).unwrap());
        assert!(!build_compiler(&ToolCommand::new("false")).unwrap());
        assert!(build_compiler(&ToolCommand::new("/nonexistent/swift")).is_err());
    }
}
