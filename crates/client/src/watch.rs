//! Submit-and-watch flow on top of [`FolioClient`].
//!
//! Each call to [`ReportWatcher::submit_and_watch`] starts a fresh poll
//! cycle with an empty known set. Starting a cycle invalidates every cycle
//! started before it on the same watcher, so an older watch still in flight
//! returns [`CycleOutcome::Abandoned`] instead of mixing stale reports into
//! the new ones.

use folio_core::jobs::{JobAccepted, SourceDocument};
use folio_core::polling::{run_cycle, CycleCounter, CycleOutcome, PollSettings};

use crate::api::{ClientError, FolioClient};

/// Result of one submit-and-watch round.
#[derive(Debug, Clone)]
pub struct WatchResult {
    pub accepted: JobAccepted,
    pub outcome: CycleOutcome,
}

#[derive(Debug, Clone)]
pub struct ReportWatcher {
    client: FolioClient,
    settings: PollSettings,
    cycles: CycleCounter,
}

impl ReportWatcher {
    pub fn new(client: FolioClient) -> Self {
        Self::with_settings(client, PollSettings::default())
    }

    pub fn with_settings(client: FolioClient, settings: PollSettings) -> Self {
        Self {
            client,
            settings,
            cycles: CycleCounter::new(),
        }
    }

    pub fn client(&self) -> &FolioClient {
        &self.client
    }

    /// Submit a job and poll until its reports are complete.
    ///
    /// A failed submission starts no cycle but still invalidates earlier ones.
    pub async fn submit_and_watch(
        &self,
        selected_text: &str,
        documents: &[SourceDocument],
    ) -> Result<WatchResult, ClientError> {
        let token = self.cycles.begin();
        let accepted = self.client.submit_job(selected_text, documents).await?;
        tracing::debug!(run_id = %accepted.run_id, cycle = token.id(), "Job accepted, watching reports");

        let outcome = run_cycle(&self.client, self.settings, Some(accepted.run_id), token).await?;
        Ok(WatchResult { accepted, outcome })
    }

    /// Stop any cycle in flight without starting a new job.
    pub fn abandon(&self) {
        self.cycles.begin();
    }
}
