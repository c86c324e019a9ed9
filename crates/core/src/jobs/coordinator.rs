//! Single-flight coordinator for the report worker.
//!
//! At most one worker process exists at a time. Submitting a job first
//! terminates the previous worker and waits for it to be gone, then resets
//! the output directory, stages inputs, probes the interpreter and spawns
//! the new worker. The whole sequence runs under one async mutex, so two
//! submissions can never interleave.
//!
//! Each spawned worker is owned by a monitor task. The monitor waits for
//! either natural exit or a cancel request, reports the exit code back over
//! a oneshot channel *before* touching the shared lock (preemption holds
//! the lock while it waits for that report), then removes the staging
//! directory and records the outcome if its run is still current.
//!
//! Workers have no timeout. A runaway worker is only stopped by the next
//! submission, an explicit cancel, or shutdown.

use std::path::Path;
use std::sync::Arc;

use tokio::process::Child;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::launcher::{self, StagedInputs, WorkerPaths};
use super::types::{JobAccepted, JobError, JobRequest};
use crate::run_state::RunState;
use crate::scripting::{PythonInterpreter, ScriptError};
use crate::terminate::ProcessTerminator;

/// Static configuration of the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub paths: WorkerPaths,
    /// URL prefix clients use to fetch raw output files.
    pub output_url: String,
}

/// Handle to the live worker, owned exclusively by the coordinator.
struct ActiveRun {
    run_id: Uuid,
    pid: Option<u32>,
    cancel: oneshot::Sender<()>,
    /// Resolves with the exit code once the process is gone.
    exited: oneshot::Receiver<Option<i32>>,
    monitor: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    state: RunState,
    active: Option<ActiveRun>,
}

/// Owns the run state and the single worker process.
pub struct JobCoordinator {
    inner: Arc<Mutex<Inner>>,
    settings: CoordinatorSettings,
    interpreter: PythonInterpreter,
    terminator: Arc<dyn ProcessTerminator>,
}

impl JobCoordinator {
    pub fn new(
        settings: CoordinatorSettings,
        interpreter: PythonInterpreter,
        terminator: Arc<dyn ProcessTerminator>,
    ) -> Self {
        tracing::debug!(
            interpreter = interpreter.program(),
            terminator = terminator.name(),
            "Job coordinator created",
        );
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            settings,
            interpreter,
            terminator,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.paths.output_dir
    }

    /// Snapshot of the current run state.
    pub async fn status(&self) -> RunState {
        self.inner.lock().await.state.clone()
    }

    /// Terminate any running worker and start a new one for `request`.
    ///
    /// Returns as soon as the worker is spawned. Precondition failures
    /// leave no process running and no staging directory behind, and so
    /// does dropping the returned future before the worker is spawned.
    pub async fn submit(&self, request: JobRequest) -> Result<JobAccepted, JobError> {
        request.validate()?;

        let mut inner = self.inner.lock().await;

        self.preempt(&mut inner).await;

        let paths = &self.settings.paths;
        launcher::reset_output_dir(&paths.output_dir)
            .await
            .map_err(JobError::Staging)?;

        let run_id = Uuid::new_v4();
        let staged = launcher::stage_inputs(&paths.staging_root, run_id, &request)
            .await
            .map_err(JobError::Staging)?;

        if let Err(e) = self.interpreter.probe().await {
            staged.remove().await;
            let diagnostics = match e {
                ScriptError::InterpreterUnavailable { output, .. } => output,
                other => other.to_string(),
            };
            tracing::error!(
                interpreter = self.interpreter.program(),
                %diagnostics,
                "Interpreter probe failed, job not started",
            );
            return Err(JobError::InterpreterNotFound {
                program: self.interpreter.program().to_string(),
                diagnostics,
            });
        }

        let mut child = match launcher::spawn_worker(&self.interpreter, paths, &staged) {
            Ok(child) => child,
            Err(e) => {
                staged.remove().await;
                tracing::error!(%run_id, error = %e, "Failed to spawn worker");
                return Err(JobError::Launch(e));
            }
        };

        let pid = child.id();
        launcher::forward_output(&mut child, run_id);
        inner.state.set_running(run_id);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (exited_tx, exited_rx) = oneshot::channel();
        let monitor = tokio::spawn(monitor_run(
            Arc::clone(&self.inner),
            Arc::clone(&self.terminator),
            child,
            run_id,
            staged,
            cancel_rx,
            exited_tx,
        ));

        inner.active = Some(ActiveRun {
            run_id,
            pid,
            cancel: cancel_tx,
            exited: exited_rx,
            monitor,
        });

        tracing::info!(
            %run_id,
            pid,
            documents = request.documents.len(),
            "Worker started",
        );

        Ok(JobAccepted {
            run_id,
            output_dir_url: self.settings.output_url.clone(),
        })
    }

    /// Terminate the running worker, if any, without starting another.
    ///
    /// Returns whether a worker was running.
    pub async fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().await;
        self.preempt(&mut inner).await
    }

    /// Terminate the running worker and wait for its monitor to finish.
    pub async fn shutdown(&self) {
        let monitor = {
            let mut inner = self.inner.lock().await;
            self.stop_active(&mut inner).await
        };
        if let Some(monitor) = monitor {
            let _ = monitor.await;
        }
    }

    async fn preempt(&self, inner: &mut Inner) -> bool {
        self.stop_active(inner).await.is_some()
    }

    /// Stop the active worker and wait until it has exited.
    ///
    /// The run is marked stopped with the exit code the monitor observed:
    /// `None` when it had to be killed. Returns the monitor's handle, which
    /// finishes once it has cleaned up and can take the lock.
    async fn stop_active(&self, inner: &mut Inner) -> Option<JoinHandle<()>> {
        let active = inner.active.take()?;

        tracing::info!(run_id = %active.run_id, pid = active.pid, "Preempting running worker");

        // The monitor may already have seen a natural exit; then nobody
        // listens for the cancel and its exit code is reported instead.
        let _ = active.cancel.send(());
        let exit_code = active.exited.await.ok().flatten();

        if inner.state.is_current(active.run_id) {
            inner.state.set_stopped(exit_code);
        }
        Some(active.monitor)
    }
}

/// Own `child` until it exits or is cancelled, then clean up.
async fn monitor_run(
    inner: Arc<Mutex<Inner>>,
    terminator: Arc<dyn ProcessTerminator>,
    mut child: Child,
    run_id: Uuid,
    staged: StagedInputs,
    cancel: oneshot::Receiver<()>,
    exited: oneshot::Sender<Option<i32>>,
) {
    // A natural exit wins over a cancel arriving in the same poll.
    let exit_code = tokio::select! {
        biased;
        status = child.wait() => match status {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!(%run_id, error = %e, "Failed to wait for worker");
                None
            }
        },
        // Also fires if the coordinator drops the handle.
        _ = cancel => {
            if let Err(e) = terminator.terminate(&mut child).await {
                tracing::warn!(%run_id, error = %e, "Failed to terminate worker");
            }
            None
        }
    };

    let _ = exited.send(exit_code);
    staged.remove().await;

    let mut guard = inner.lock().await;
    if guard.state.is_running(run_id) {
        guard.state.set_stopped(exit_code);
        if guard.active.as_ref().is_some_and(|a| a.run_id == run_id) {
            guard.active = None;
        }
        match exit_code {
            Some(0) => tracing::info!(%run_id, "Worker finished"),
            code => tracing::warn!(%run_id, exit_code = ?code, "Worker exited unsuccessfully"),
        }
    } else {
        tracing::debug!(%run_id, exit_code = ?exit_code, "Preempted worker cleaned up");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
