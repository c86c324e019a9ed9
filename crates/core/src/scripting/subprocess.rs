//! Shared subprocess management utilities.
//!
//! Provides [`run_command`], the blocking-until-exit execution path used by
//! the synchronous scripts (outline extraction, podcast synthesis) and the
//! interpreter probe. The long-running report worker is spawned detached by
//! the job launcher instead.

use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::types::{ScriptError, ScriptInput, ScriptOutput};

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Spawn `cmd`, feed it the optional stdin payload, capture stdout/stderr,
/// and enforce the configured timeout.
///
/// The caller sets the program and leading arguments; `input.args`,
/// environment variables and working directory are applied here.
pub async fn run_command(
    cmd: &mut Command,
    input: ScriptInput,
) -> Result<ScriptOutput, ScriptError> {
    // `kill_on_drop(true)` kills the child when it is dropped on timeout.
    cmd.args(&input.args)
        .stdin(if input.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }

    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(ScriptError::IoError)?;

    if let (Some(mut stdin), Some(payload)) = (child.stdin.take(), input.stdin) {
        // Best-effort write; if the process closes stdin early, ignore the error.
        let _ = stdin.write_all(&payload).await;
        drop(stdin);
    }

    // Read the pipes in spawned tasks so `child.wait()` can borrow `&mut child`.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    let wait_result = tokio::time::timeout(input.timeout, child.wait()).await;

    match wait_result {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();

            Ok(ScriptOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        Ok(Err(e)) => Err(ScriptError::IoError(e)),
        Err(_elapsed) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            // Dropping `child` here kills the process (kill_on_drop).
            drop(child);
            stdout_task.abort();
            stderr_task.abort();
            Err(ScriptError::Timeout { elapsed_ms })
        }
    }
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn bash(script: &str) -> Command {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = run_command(
            &mut bash("echo hello; exit 3"),
            ScriptInput::with_timeout(Duration::from_secs(5)),
        )
        .await
        .expect("run");
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn pipes_stdin_payload() {
        let mut input = ScriptInput::with_timeout(Duration::from_secs(5));
        input.stdin = Some(b"two speakers talking".to_vec());
        let out = run_command(&mut bash("cat"), input).await.expect("run");
        assert_eq!(out.stdout, "two speakers talking");
    }

    #[tokio::test]
    async fn appends_args_and_env() {
        let mut input = ScriptInput::with_timeout(Duration::from_secs(5));
        input.args = vec!["first".into(), "second".into()];
        input.env_vars = vec![("FOLIO_TEST_VAR".into(), "set".into())];
        // With `bash -c`, the first extra arg becomes $0.
        let out = run_command(&mut bash("echo \"$0 $1 $FOLIO_TEST_VAR\""), input)
            .await
            .expect("run");
        assert_eq!(out.stdout.trim(), "first second set");
    }

    #[tokio::test]
    async fn kills_on_timeout() {
        let input = ScriptInput::with_timeout(Duration::from_millis(200));
        let result = run_command(&mut bash("sleep 30"), input).await;
        assert_matches!(result, Err(ScriptError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let mut cmd = Command::new("folio-definitely-missing-binary");
        let result = run_command(&mut cmd, ScriptInput::with_timeout(Duration::from_secs(1))).await;
        assert_matches!(result, Err(ScriptError::IoError(_)));
    }
}
