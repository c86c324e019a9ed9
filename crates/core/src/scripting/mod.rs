//! Script subprocess plumbing.
//!
//! Everything needed to invoke the external Python scripts: the interpreter
//! handle with its version probe, the run-to-completion subprocess helper,
//! and the shared input/output/error types.

pub mod python;
pub mod subprocess;
pub mod types;

pub use python::PythonInterpreter;
pub use types::{ScriptError, ScriptInput, ScriptOutput};
