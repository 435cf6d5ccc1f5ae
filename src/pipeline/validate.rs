//! Business-rule validation gating a process past the Creating step.

use super::Pipeline;
use crate::error::{Error, Result};
use crate::types::{Process, Status};

impl Pipeline {
    /// Check whether the process may proceed
    ///
    /// Two read-then-decide checks, deliberately without locking (the store
    /// serializes individual queries, not the sequence): two requests for the
    /// same URL admitted at the same instant can both observe a count of 1
    /// and both proceed.
    pub(crate) async fn validate(&self, process: &Process) -> Result<()> {
        // The candidate itself is already persisted as in-progress, so a
        // count above 1 means another job is active for this URL.
        let count = self
            .store
            .process_count_by_url_and_status(&process.request.url, Status::InProgress)
            .await
            .map_err(|e| Error::ProcessCount(e.to_string()))?;
        if count > 1 {
            return Err(Error::EpisodeInProgress);
        }

        if process.request.force {
            return Ok(());
        }
        let existing = self
            .store
            .episodes_by_original_url(&process.request.url)
            .await
            .map_err(|e| Error::EpisodeQuery(e.to_string()))?;
        if !existing.is_empty() {
            return Err(Error::EpisodeExists);
        }

        Ok(())
    }
}
