//! Startup recovery of interrupted processes.

use super::Pipeline;
use crate::error::{Error, ProcessError, Result};
use crate::types::Status;

impl Pipeline {
    /// Fail every process left in progress by a previous run
    ///
    /// Must run once before [`start`](Pipeline::start). In-progress rows can
    /// only exist if the previous run crashed or was killed mid-job; each is
    /// forced to Failed with an interrupted error, persisted, and notified.
    ///
    /// Unlike the steady-state path, persistence failures here are fatal:
    /// a store that cannot be written at startup is unusable.
    pub async fn init(&self) -> Result<()> {
        let processes = self
            .store
            .processes_by_status(Status::InProgress)
            .await
            .map_err(|e| Error::ProcessQuery(e.to_string()))?;

        if processes.is_empty() {
            return Ok(());
        }

        tracing::info!(count = processes.len(), "Failing interrupted processes");
        for mut process in processes {
            process.status = Status::Failed;
            process.error = Some(ProcessError::from(&Error::ProcessInterrupted));
            self.store
                .process_upsert(&mut process)
                .await
                .map_err(|e| Error::ProcessUpsert(e.to_string()))?;
            tracing::info!(
                process_id = %process.id,
                url = %process.request.url,
                "Interrupted process marked failed"
            );
            self.send_notify(&process);
        }

        Ok(())
    }
}
