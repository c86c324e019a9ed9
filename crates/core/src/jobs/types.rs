//! Job submission inputs, acknowledgements and errors.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One uploaded source document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A request to run the report worker over a batch of documents.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Free-text task description (the user's text selection).
    pub query: String,
    pub documents: Vec<SourceDocument>,
}

impl JobRequest {
    /// Check the preconditions that need no filesystem or process access.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.query.trim().is_empty() {
            return Err(JobError::MissingTaskDescription);
        }
        if self.documents.is_empty() {
            return Err(JobError::NoDocumentsProvided);
        }
        Ok(())
    }
}

/// Parameter file handed to the worker as `input/input.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskParameters {
    pub persona: Persona,
    pub job_to_be_done: JobToBeDone,
    pub query: Query,
    pub filters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobToBeDone {
    pub task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub selected_text: String,
}

impl TaskParameters {
    /// Recommendation task for the given selected text.
    pub fn recommend(selected_text: &str) -> Self {
        Self {
            persona: Persona {
                role: "user".to_string(),
            },
            job_to_be_done: JobToBeDone {
                task: "recommend".to_string(),
            },
            query: Query {
                selected_text: selected_text.to_string(),
            },
            filters: serde_json::Map::new(),
        }
    }
}

/// Acknowledgement returned once the worker has been spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAccepted {
    pub run_id: Uuid,
    /// Where outputs accumulate for this run.
    pub output_dir_url: String,
}

/// Reasons a submission was refused. Nothing is left running after any of
/// these.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("missing task description")]
    MissingTaskDescription,

    #[error("no documents provided")]
    NoDocumentsProvided,

    #[error("interpreter '{program}' could not be invoked")]
    InterpreterNotFound { program: String, diagnostics: String },

    #[error("failed to stage job inputs: {0}")]
    Staging(#[source] std::io::Error),

    #[error("failed to launch worker: {0}")]
    Launch(#[source] std::io::Error),
}

impl JobError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::MissingTaskDescription => "missing_task_description",
            JobError::NoDocumentsProvided => "no_documents_provided",
            JobError::InterpreterNotFound { .. } => "interpreter_not_found",
            JobError::Staging(_) | JobError::Launch(_) => "launch_failed",
        }
    }

    /// Captured diagnostic output, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            JobError::InterpreterNotFound { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }

    /// Whether the caller sent something unusable (as opposed to a server
    /// side failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            JobError::MissingTaskDescription | JobError::NoDocumentsProvided
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
