//! Results of commands executed inside a running instance.

/// Output from an exec command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code, absent when the command did not run to completion.
    pub exit_code: Option<i32>,
    /// Signal that terminated the command, if any.
    pub signal: Option<i32>,
}

impl ExecOutput {
    /// Builds the output of a command that exited with `exit_code`.
    #[must_use]
    pub fn exited(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            signal: None,
        }
    }

    /// Builds the output of a command terminated before it could exit.
    #[must_use]
    pub fn interrupted(signal: Option<i32>) -> Self {
        Self {
            signal,
            ..Self::default()
        }
    }

    /// Returns `true` when the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Returns `true` when the command was interrupted.
    #[must_use]
    pub const fn was_interrupted(&self) -> bool {
        self.exit_code.is_none()
    }

    /// Standard error if non-empty, otherwise standard output, trimmed.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Converts a finished process into an [`ExecOutput`].
#[must_use]
pub fn from_process_output(output: &std::process::Output) -> ExecOutput {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    match output.status.code() {
        Some(code) => ExecOutput::exited(code, stdout, stderr),
        None => ExecOutput {
            stdout,
            stderr,
            exit_code: None,
            signal: terminating_signal(output.status),
        },
    }
}

#[cfg(unix)]
fn terminating_signal(status: std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
const fn terminating_signal(_status: std::process::ExitStatus) -> Option<i32> {
    None
}
