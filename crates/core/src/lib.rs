//! Folio domain logic.
//!
//! Everything here is free of HTTP concerns: the single-flight job
//! coordinator and its process plumbing, report discovery over the shared
//! output directory, byte-range and path-safety helpers for file serving,
//! and the client-side polling state machine.

pub mod error;
pub mod files;
pub mod jobs;
pub mod polling;
pub mod range;
pub mod reports;
pub mod run_state;
pub mod scripting;
pub mod terminate;
