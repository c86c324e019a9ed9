//! Filesystem and process steps of launching the report worker.
//!
//! Layout handed to the worker:
//!
//! ```text
//! <staging_root>/run-<run_id>/input/input.json
//! <staging_root>/run-<run_id>/input/PDFs/<sanitized name>...
//! ```
//!
//! invoked as `<python> <script> <input_dir> <output_dir> <model_dir>`.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use uuid::Uuid;

use super::types::{JobRequest, TaskParameters};
use crate::files::sanitize_file_name;
use crate::scripting::PythonInterpreter;

/// Where the worker reads from and writes to.
#[derive(Debug, Clone)]
pub struct WorkerPaths {
    /// The worker script.
    pub script: PathBuf,
    /// Shared output directory, cleared at the start of every run.
    pub output_dir: PathBuf,
    /// Model directory passed through to the worker untouched.
    pub model_dir: PathBuf,
    /// Parent of the per-run staging directories.
    pub staging_root: PathBuf,
}

/// Remove everything in `dir` and recreate it empty.
pub async fn reset_output_dir(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::create_dir_all(dir).await
}

/// Per-run staging directory holding the worker's inputs.
///
/// Dropping it without calling [`StagedInputs::remove`] deletes the
/// directory synchronously, so an abandoned submission leaves nothing behind.
#[derive(Debug)]
pub struct StagedInputs {
    root: PathBuf,
    input_dir: PathBuf,
    removed: bool,
}

impl StagedInputs {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Delete the staging directory. Failures are logged, not returned.
    pub async fn remove(mut self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.root.display(), error = %e, "Failed to remove staging dir");
            }
        }
        self.removed = true;
    }
}

impl Drop for StagedInputs {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {
                tracing::debug!(path = %self.root.display(), "Removed abandoned staging dir");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.root.display(), error = %e, "Failed to remove staging dir");
            }
        }
    }
}

/// Write the request's documents and parameter file under `staging_root`.
///
/// On failure the partially written directory is removed.
pub async fn stage_inputs(
    staging_root: &Path,
    run_id: Uuid,
    request: &JobRequest,
) -> io::Result<StagedInputs> {
    let root = staging_root.join(format!("run-{run_id}"));
    let staged = StagedInputs {
        input_dir: root.join("input"),
        root,
        removed: false,
    };

    match write_inputs(&staged, request).await {
        Ok(()) => Ok(staged),
        Err(e) => {
            staged.remove().await;
            Err(e)
        }
    }
}

async fn write_inputs(staged: &StagedInputs, request: &JobRequest) -> io::Result<()> {
    let pdfs_dir = staged.input_dir.join("PDFs");
    tokio::fs::create_dir_all(&pdfs_dir).await?;

    let mut used = HashSet::new();
    for doc in &request.documents {
        let name = unique_name(&mut used, sanitize_file_name(&doc.file_name));
        tokio::fs::write(pdfs_dir.join(name), &doc.content).await?;
    }

    let params = serde_json::to_vec_pretty(&TaskParameters::recommend(&request.query))
        .map_err(io::Error::other)?;
    tokio::fs::write(staged.input_dir.join("input.json"), params).await
}

/// Prefix a counter when two uploads sanitize to the same name.
fn unique_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{n}_{name}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Spawn the worker for `staged`. Does not wait for it.
pub fn spawn_worker(
    interpreter: &PythonInterpreter,
    paths: &WorkerPaths,
    staged: &StagedInputs,
) -> io::Result<Child> {
    let mut cmd = interpreter.command(&paths.script);
    cmd.arg(staged.input_dir())
        .arg(&paths.output_dir)
        .arg(&paths.model_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd.spawn()
}

/// Log the worker's stdout and stderr line by line.
pub fn forward_output(child: &mut Child, run_id: Uuid) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(log_lines(stdout, run_id, "stdout"));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(log_lines(stderr, run_id, "stderr"));
    }
}

async fn log_lines<R: AsyncRead + Unpin>(stream: R, run_id: Uuid, name: &'static str) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if !line.trim().is_empty() => {
                if name == "stderr" {
                    tracing::warn!(%run_id, stream = name, "{}", line.trim_end());
                } else {
                    tracing::info!(%run_id, stream = name, "{}", line.trim_end());
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(%run_id, stream = name, error = %e, "Worker output stream closed");
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::SourceDocument;

    fn request(names: &[&str]) -> JobRequest {
        JobRequest {
            query: "ocean currents".into(),
            documents: names
                .iter()
                .map(|n| SourceDocument {
                    file_name: n.to_string(),
                    content: format!("pdf bytes of {n}").into_bytes(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn reset_removes_stale_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("outputs");
        std::fs::create_dir_all(out.join("nested")).unwrap();
        std::fs::write(out.join("old.json"), "{}").unwrap();
        std::fs::write(out.join("nested/old.json"), "{}").unwrap();

        reset_output_dir(&out).await.expect("reset");

        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn reset_creates_missing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("a/b/outputs");
        reset_output_dir(&out).await.expect("reset");
        assert!(out.is_dir());
    }

    #[tokio::test]
    async fn stages_documents_and_parameters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let run_id = Uuid::new_v4();
        let staged = stage_inputs(dir.path(), run_id, &request(&["Field Notes.pdf", "../x.pdf"]))
            .await
            .expect("stage");

        assert!(staged.root().ends_with(format!("run-{run_id}")));
        let pdfs = staged.input_dir().join("PDFs");
        assert!(pdfs.join("Field_Notes.pdf").is_file());
        assert!(pdfs.join(".._x.pdf").is_file());

        let params: serde_json::Value = serde_json::from_slice(
            &std::fs::read(staged.input_dir().join("input.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(params["query"]["selected_text"], "ocean currents");

        let root = staged.root().to_path_buf();
        staged.remove().await;
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn colliding_names_are_kept_apart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staged = stage_inputs(dir.path(), Uuid::new_v4(), &request(&["a b.pdf", "a_b.pdf"]))
            .await
            .expect("stage");

        let pdfs = staged.input_dir().join("PDFs");
        assert!(pdfs.join("a_b.pdf").is_file());
        assert!(pdfs.join("1_a_b.pdf").is_file());
    }

    #[tokio::test]
    async fn dropped_staging_removes_its_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staged = stage_inputs(dir.path(), Uuid::new_v4(), &request(&["a.pdf"]))
            .await
            .expect("stage");
        let root = staged.root().to_path_buf();
        assert!(root.is_dir());

        drop(staged);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn staging_failure_leaves_nothing_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A file where the staging root should be makes directory creation fail.
        let blocker = dir.path().join("staging");
        std::fs::write(&blocker, "not a directory").unwrap();

        let result = stage_inputs(&blocker, Uuid::new_v4(), &request(&["a.pdf"])).await;
        assert!(result.is_err());
        assert!(blocker.is_file());
    }
}
