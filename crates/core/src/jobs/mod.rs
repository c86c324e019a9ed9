//! Submitting, supervising and preempting the report worker.

pub mod coordinator;
pub mod launcher;
pub mod types;

pub use coordinator::{CoordinatorSettings, JobCoordinator};
pub use launcher::WorkerPaths;
pub use types::{JobAccepted, JobError, JobRequest, SourceDocument, TaskParameters};
