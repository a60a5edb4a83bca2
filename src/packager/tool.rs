//! External tool invocation and failure diagnostics.
//!
//! Every packaging tool is run through [`ToolInvocation::run`], which captures
//! both output streams. A tool that exits non-zero produces a [`ToolFailure`]
//! value carrying a structured diagnostic; only a tool that cannot be started
//! at all is an [`Error`].

use super::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// A tool run that exited unsuccessfully.
///
/// `Display` renders the diagnostic block written to the log:
///
/// ```text
/// Error: Subprocess failed.
///     Command: /usr/bin/pkgbuild --identifier com.example ...
///     Return Code: 1
///     Standard Output:
///         None
///     Standard Error:
///         pkgbuild: error: Cannot write package to "out.pkg".
///     Called by: src/packager/pipeline.rs:212:27
/// ```
#[derive(Debug, Clone)]
pub struct ToolFailure {
    /// Full command line
    pub command: String,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
    /// Source location that built the invocation
    pub caller: &'static Location<'static>,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: Subprocess failed.")?;
        writeln!(f, "    Command: {}", self.command)?;
        match self.code {
            Some(code) => writeln!(f, "    Return Code: {code}")?,
            None => writeln!(f, "    Return Code: terminated by signal")?,
        }
        writeln!(f, "    Standard Output:")?;
        write_indented(f, &self.stdout)?;
        writeln!(f, "    Standard Error:")?;
        write_indented(f, &self.stderr)?;
        write!(f, "    Called by: {}", self.caller)
    }
}

fn write_indented(f: &mut fmt::Formatter<'_>, output: &str) -> fmt::Result {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty()).peekable();
    if lines.peek().is_none() {
        return writeln!(f, "        None");
    }
    for line in lines {
        writeln!(f, "        {line}")?;
    }
    Ok(())
}

/// Result of running a tool that could be started.
pub type ToolResult = std::result::Result<ToolOutput, ToolFailure>;

/// A program plus its argument vector.
///
/// The invocation remembers where it was constructed; that location is
/// reported as the caller in failure diagnostics.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<OsString>,
    caller: &'static Location<'static>,
}

impl ToolInvocation {
    /// Creates an invocation of `program` with no arguments.
    #[track_caller]
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            caller: Location::caller(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    /// Program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument vector, program excluded.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Space-joined command line for logs and diagnostics.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the tool to completion and captures its output.
    ///
    /// A non-zero exit is logged with `log::error!` and returned as
    /// `Ok(Err(ToolFailure))`.
    pub async fn run(&self) -> Result<ToolResult> {
        let command_line = self.command_line();
        log::debug!("Running: {}", command_line);

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|error| Error::CommandFailed {
                command: command_line.clone(),
                error,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            return Ok(Ok(ToolOutput { stdout, stderr }));
        }

        let failure = ToolFailure {
            command: command_line,
            code: output.status.code(),
            stdout,
            stderr,
            caller: self.caller,
        };
        log::error!("{}", failure);
        Ok(Err(failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_joins_program_and_args() {
        let invocation = ToolInvocation::new("/usr/bin/pkgbuild")
            .arg("--identifier")
            .arg("com.example")
            .args(["--version", "1.0.0"]);
        assert_eq!(
            invocation.command_line(),
            "/usr/bin/pkgbuild --identifier com.example --version 1.0.0"
        );
    }

    #[test]
    fn test_failure_diagnostic_layout() {
        let failure = ToolFailure {
            command: "/usr/bin/productsign --sign X a.pkg a.pkg.signed".into(),
            code: Some(1),
            stdout: String::new(),
            stderr: "line one\n\nline two\n".into(),
            caller: Location::caller(),
        };
        let text = failure.to_string();
        assert!(text.starts_with("Error: Subprocess failed.\n"));
        assert!(text.contains("    Return Code: 1\n"));
        assert!(text.contains("    Standard Output:\n        None\n"));
        assert!(text.contains("    Standard Error:\n        line one\n        line two\n"));
        assert!(text.contains("    Called by: "));
        assert!(text.contains("tool.rs"));
    }

    #[test]
    fn test_invocation_records_construction_site() {
        let invocation = ToolInvocation::new("true");
        assert!(invocation.caller.file().ends_with("tool.rs"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_a_value() {
        let result = ToolInvocation::new("/bin/sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .run()
            .await
            .expect("sh should start");
        let failure = result.expect_err("exit 3 should fail");
        assert_eq!(failure.code, Some(3));
        assert_eq!(failure.stdout.trim(), "out");
        assert_eq!(failure.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_captures_stdout() {
        let output = ToolInvocation::new("/bin/sh")
            .args(["-c", "echo hello"])
            .run()
            .await
            .expect("sh should start")
            .expect("sh should succeed");
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_executable_is_an_error() {
        let err = ToolInvocation::new("/definitely/not/a/tool")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }
}
