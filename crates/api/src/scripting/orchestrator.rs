//! Synchronous script runs behind the outline and podcast endpoints.
//!
//! Unlike the report worker these scripts are short-lived: the request
//! waits for them, subject to the configured script timeout. Held in
//! [`AppState`](crate::state::AppState) as an `Arc<ScriptOrchestrator>`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_core::files::sanitize_file_name;
use folio_core::scripting::{PythonInterpreter, ScriptError, ScriptInput, ScriptOutput};
use serde::Serialize;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Stdout marker the outline script prints in front of the file it saved.
const SAVED_JSON_MARKER: &str = "SAVED_JSON::";

/// URL prefix under which stored outlines are served.
pub const OUTLINES_URL_PREFIX: &str = "/api/v1/outlines/";

/// A freshly extracted outline.
#[derive(Debug, Serialize)]
pub struct OutlineResult {
    /// Name of the stored outline file.
    pub file_name: String,
    pub url: String,
    pub outline: serde_json::Value,
}

pub struct ScriptOrchestrator {
    interpreter: PythonInterpreter,
    outline_script: PathBuf,
    podcast_script: PathBuf,
    outlines_dir: PathBuf,
    audio_dir: PathBuf,
    staging_root: PathBuf,
    timeout: Duration,
}

impl ScriptOrchestrator {
    pub fn new(interpreter: PythonInterpreter, config: &ServerConfig) -> Self {
        Self {
            interpreter,
            outline_script: config.outline_script.clone(),
            podcast_script: config.podcast_script.clone(),
            outlines_dir: config.outlines_dir(),
            audio_dir: config.audio_dir(),
            staging_root: config.staging_dir.clone(),
            timeout: config.script_timeout(),
        }
    }

    pub fn outlines_dir(&self) -> &Path {
        &self.outlines_dir
    }

    /// Run the outline script over one uploaded document.
    ///
    /// The script is invoked as `--input <file> --output <outlines_dir>` and
    /// may announce the file it wrote with a `SAVED_JSON::<path>` line;
    /// otherwise `<stem>.json` is assumed.
    pub async fn extract_outline(&self, file_name: &str, content: &[u8]) -> AppResult<OutlineResult> {
        let safe_name = sanitize_file_name(file_name);
        let work_dir = self.staging_root.join(format!("outline-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to create staging dir: {e}")))?;

        let result = self.run_outline(&work_dir, &safe_name, content).await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!(path = %work_dir.display(), error = %e, "Failed to remove outline staging dir");
        }

        let output = result?;
        let saved = saved_outline_name(&output, &safe_name);
        let bytes = tokio::fs::read(self.outlines_dir.join(&saved))
            .await
            .map_err(|e| AppError::InternalError(format!("Outline '{saved}' was not written: {e}")))?;
        let outline: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::InternalError(format!("Outline '{saved}' is not valid JSON: {e}")))?;

        tracing::info!(file = %saved, duration_ms = output.duration_ms, "Outline extracted");

        Ok(OutlineResult {
            url: format!("{OUTLINES_URL_PREFIX}{saved}"),
            file_name: saved,
            outline,
        })
    }

    async fn run_outline(
        &self,
        work_dir: &Path,
        safe_name: &str,
        content: &[u8],
    ) -> AppResult<ScriptOutput> {
        let input_path = work_dir.join(safe_name);
        tokio::fs::write(&input_path, content)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))?;
        tokio::fs::create_dir_all(&self.outlines_dir)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to create outline dir: {e}")))?;

        self.interpreter.probe().await?;

        let mut input = ScriptInput::with_timeout(self.timeout);
        input.args = vec![
            "--input".into(),
            input_path.display().to_string(),
            "--output".into(),
            self.outlines_dir.display().to_string(),
        ];
        let output = self.interpreter.run_script(&self.outline_script, input).await?;
        Ok(ensure_success(output)?)
    }

    /// Run the podcast script with `text` on stdin and return the audio URL
    /// it prints as its last stdout line.
    ///
    /// The script is invoked as `--output <audio_dir>`.
    pub async fn synthesize_podcast(&self, text: &str) -> AppResult<String> {
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("Missing text".to_string()));
        }

        tokio::fs::create_dir_all(&self.audio_dir)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to create audio dir: {e}")))?;

        self.interpreter.probe().await?;

        let mut input = ScriptInput::with_timeout(self.timeout);
        input.args = vec!["--output".into(), self.audio_dir.display().to_string()];
        input.stdin = Some(text.as_bytes().to_vec());

        let output = ensure_success(
            self.interpreter
                .run_script(&self.podcast_script, input)
                .await?,
        )?;
        if !output.stderr.trim().is_empty() {
            tracing::warn!(stderr = %output.stderr.trim(), "Podcast script wrote to stderr");
        }

        let audio_url = output
            .last_line()
            .ok_or_else(|| AppError::InternalError("Podcast script printed no audio URL".into()))?
            .to_string();
        tracing::info!(%audio_url, duration_ms = output.duration_ms, "Podcast synthesized");
        Ok(audio_url)
    }
}

fn ensure_success(output: ScriptOutput) -> Result<ScriptOutput, ScriptError> {
    if output.success() {
        return Ok(output);
    }
    let stderr = if output.stderr.trim().is_empty() {
        output.stdout
    } else {
        output.stderr
    };
    Err(ScriptError::ExecutionFailed {
        exit_code: output.exit_code,
        stderr,
    })
}

/// File name the outline script saved, from its marker line or the upload's stem.
fn saved_outline_name(output: &ScriptOutput, safe_name: &str) -> String {
    let announced = output
        .stdout
        .lines()
        .find_map(|l| l.trim().strip_prefix(SAVED_JSON_MARKER))
        .and_then(|p| Path::new(p.trim()).file_name())
        .map(|n| n.to_string_lossy().into_owned());

    announced.unwrap_or_else(|| {
        let stem = Path::new(safe_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| safe_name.to_string());
        format!("{stem}.json")
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
