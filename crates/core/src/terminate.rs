//! Process termination strategies.
//!
//! A worker may spawn its own children, so stopping it is platform
//! specific. [`platform_terminator`] picks the strategy once at startup and
//! the coordinator only ever talks to the [`ProcessTerminator`] trait.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

/// Default wait between the graceful signal and the forced kill.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(1500);

/// Stops a running child process and reaps it.
///
/// Implementations return once the process has been observed to exit.
#[async_trait]
pub trait ProcessTerminator: Send + Sync {
    async fn terminate(&self, child: &mut Child) -> io::Result<()>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// `SIGTERM`, then `SIGKILL` once the grace window has passed.
#[derive(Debug, Clone)]
pub struct SignalTerminator {
    grace: Duration,
}

impl SignalTerminator {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }
}

impl Default for SignalTerminator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

#[async_trait]
impl ProcessTerminator for SignalTerminator {
    async fn terminate(&self, child: &mut Child) -> io::Result<()> {
        let Some(pid) = child.id() else {
            // Already reaped.
            return Ok(());
        };

        send_graceful(child, pid)?;

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(pid, ?status, "Process exited after graceful signal");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    pid,
                    grace_ms = self.grace.as_millis() as u64,
                    "Process ignored graceful signal, killing",
                );
                child.start_kill()?;
                child.wait().await?;
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "signal"
    }
}

#[cfg(unix)]
fn send_graceful(_child: &mut Child, pid: u32) -> io::Result<()> {
    // SAFETY: plain syscall on a pid we own and have not yet reaped.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == -1 {
        let err = io::Error::last_os_error();
        // Exited between `id()` and the signal; `wait` will reap it.
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn send_graceful(child: &mut Child, _pid: u32) -> io::Result<()> {
    child.start_kill()
}

/// Kills the whole process tree by PID with `taskkill /t /f`.
#[derive(Debug, Clone, Default)]
pub struct TreeKillTerminator;

#[async_trait]
impl ProcessTerminator for TreeKillTerminator {
    async fn terminate(&self, child: &mut Child) -> io::Result<()> {
        let Some(pid) = child.id() else {
            return Ok(());
        };

        let status = Command::new("taskkill")
            .args(["/pid", &pid.to_string(), "/t", "/f"])
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(s) if s.success() => {}
            Ok(s) => {
                tracing::warn!(pid, code = ?s.code(), "taskkill failed, killing root process only");
                child.start_kill()?;
            }
            Err(e) => {
                tracing::warn!(pid, error = %e, "taskkill unavailable, killing root process only");
                child.start_kill()?;
            }
        }

        child.wait().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tree-kill"
    }
}

/// Select the termination strategy for the current platform.
pub fn platform_terminator(grace: Duration) -> Arc<dyn ProcessTerminator> {
    if cfg!(windows) {
        Arc::new(TreeKillTerminator)
    } else {
        Arc::new(SignalTerminator::new(grace))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
