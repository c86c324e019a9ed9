//! Shared input, output, and error types for script subprocesses.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Input passed to a script subprocess.
#[derive(Debug, Clone)]
pub struct ScriptInput {
    /// Positional arguments appended after the script path.
    pub args: Vec<String>,
    /// Bytes written to the child's stdin before it is closed. `None`
    /// leaves stdin unattached.
    pub stdin: Option<Vec<u8>>,
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<PathBuf>,
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Duration,
}

impl ScriptInput {
    /// Input with no arguments, no stdin and the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            args: Vec::new(),
            stdin: None,
            env_vars: Vec::new(),
            working_directory: None,
            timeout,
        }
    }
}

/// Captured output from a finished script.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-empty line of stdout, trimmed.
    pub fn last_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .next_back()
    }
}

/// Errors that can occur while running a script.
#[derive(Debug)]
pub enum ScriptError {
    /// The script file was not found at the specified path.
    NotFound(String),
    /// The interpreter could not be invoked (missing binary or failed
    /// version probe). Carries whatever the probe printed.
    InterpreterUnavailable { program: String, output: String },
    /// The script exceeded its configured timeout and was killed.
    Timeout { elapsed_ms: u64 },
    /// The script ran but exited with a non-zero exit code.
    ExecutionFailed { exit_code: i32, stderr: String },
    /// An I/O error occurred while spawning or communicating with the process.
    IoError(std::io::Error),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Script not found: {path}"),
            Self::InterpreterUnavailable { program, .. } => {
                write!(f, "Interpreter unavailable: {program}")
            }
            Self::Timeout { elapsed_ms } => {
                write!(f, "Script timed out after {elapsed_ms}ms")
            }
            Self::ExecutionFailed { exit_code, stderr } => {
                write!(f, "Script failed with exit code {exit_code}: {stderr}")
            }
            Self::IoError(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, exit_code: i32) -> ScriptOutput {
        ScriptOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code,
            duration_ms: 1,
        }
    }

    #[test]
    fn display_not_found() {
        let err = ScriptError::NotFound("/tmp/missing.py".to_string());
        assert_eq!(err.to_string(), "Script not found: /tmp/missing.py");
    }

    #[test]
    fn display_interpreter_unavailable() {
        let err = ScriptError::InterpreterUnavailable {
            program: "python3".to_string(),
            output: "command not found".to_string(),
        };
        assert_eq!(err.to_string(), "Interpreter unavailable: python3");
    }

    #[test]
    fn display_execution_failed() {
        let err = ScriptError::ExecutionFailed {
            exit_code: 42,
            stderr: "Traceback".to_string(),
        };
        assert_eq!(err.to_string(), "Script failed with exit code 42: Traceback");
    }

    #[test]
    fn error_source_only_for_io() {
        let io = ScriptError::IoError(std::io::Error::other("boom"));
        assert!(std::error::Error::source(&io).is_some());

        let timeout = ScriptError::Timeout { elapsed_ms: 100 };
        assert!(std::error::Error::source(&timeout).is_none());
    }

    #[test]
    fn last_line_skips_trailing_blank_lines() {
        let out = output("progress 50%\n/audio/episode.mp3\n\n", 0);
        assert_eq!(out.last_line(), Some("/audio/episode.mp3"));
        assert!(out.success());
    }

    #[test]
    fn last_line_none_for_empty_stdout() {
        assert_eq!(output("  \n", 1).last_line(), None);
        assert!(!output("", 1).success());
    }
}
