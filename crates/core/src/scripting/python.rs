//! Python interpreter handle.
//!
//! Wraps the configured interpreter program, the environment every script
//! runs with, and the `--version` probe used before committing to a launch.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use super::subprocess;
use super::types::{ScriptError, ScriptInput, ScriptOutput};

/// How long the `--version` probe may take before it counts as a failure.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment applied to every interpreter invocation. Disables the user
/// site-packages directory and forces UTF-8 stdio on every platform.
const PYTHON_ENV: [(&str, &str); 2] = [("PYTHONNOUSERSITE", "1"), ("PYTHONIOENCODING", "utf-8")];

/// A Python (or compatible) interpreter reachable by program name or path.
#[derive(Debug, Clone)]
pub struct PythonInterpreter {
    program: String,
}

impl PythonInterpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Platform default: `python` on Windows, `python3` elsewhere.
    pub fn platform_default() -> Self {
        Self::new(if cfg!(windows) { "python" } else { "python3" })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build a command running `script` under this interpreter with the
    /// standard environment applied.
    pub fn command(&self, script: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(script).envs(PYTHON_ENV);
        cmd
    }

    /// Check that the interpreter can be invoked at all.
    ///
    /// Returns the reported version string. Any spawn failure or non-zero
    /// exit becomes [`ScriptError::InterpreterUnavailable`] carrying the
    /// probe's combined output.
    pub async fn probe(&self) -> Result<String, ScriptError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--version").envs(PYTHON_ENV);

        let unavailable = |output: String| ScriptError::InterpreterUnavailable {
            program: self.program.clone(),
            output,
        };

        match subprocess::run_command(&mut cmd, ScriptInput::with_timeout(PROBE_TIMEOUT)).await {
            Ok(out) if out.success() => {
                // Python 2 prints its version to stderr.
                let version = if out.stdout.trim().is_empty() {
                    out.stderr.trim()
                } else {
                    out.stdout.trim()
                };
                Ok(version.lines().next().unwrap_or_default().to_string())
            }
            Ok(out) => Err(unavailable(format!("{}{}", out.stdout, out.stderr))),
            Err(e) => Err(unavailable(e.to_string())),
        }
    }

    /// Run `script` to completion with the given input.
    ///
    /// A missing script file is reported as [`ScriptError::NotFound`] before
    /// anything is spawned. Non-zero exits are returned as output, not
    /// errors; callers decide what a failure means for them.
    pub async fn run_script(
        &self,
        script: &Path,
        input: ScriptInput,
    ) -> Result<ScriptOutput, ScriptError> {
        if tokio::fs::metadata(script).await.is_err() {
            return Err(ScriptError::NotFound(script.display().to_string()));
        }
        let mut cmd = self.command(script);
        subprocess::run_command(&mut cmd, input).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
