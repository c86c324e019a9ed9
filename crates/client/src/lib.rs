//! HTTP client for the Folio job service.
//!
//! [`FolioClient`] wraps the REST endpoints; [`ReportWatcher`] submits a job
//! and polls its reports until the run is over, abandoning any earlier
//! watch still in flight.

pub mod api;
pub mod watch;

pub use api::{ClientError, FolioClient};
pub use watch::ReportWatcher;
