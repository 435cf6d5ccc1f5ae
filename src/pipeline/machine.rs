//! The per-request state machine.
//!
//! Single linear happy path with early exit on error at every step:
//! Creating → validate → Downloading → Publishing → Success. Every transition
//! is persisted and then broadcast as a snapshot, including failures.

use super::Pipeline;
use crate::error::{Error, ProcessError};
use crate::types::{Process, Request, Status, Step};

impl Pipeline {
    /// Drive one request through the state machine to a terminal status
    pub(crate) async fn handle(&self, request: Request) {
        let mut process = Process::new(request);

        // Create
        if let Err(e) = self.update(&mut process).await {
            return self.fail(&mut process, e).await;
        }

        // Validate
        if let Err(e) = self.validate(&process).await {
            return self.fail(&mut process, e).await;
        }

        // Download episode
        process.step = Step::Downloading;
        if let Err(e) = self.update(&mut process).await {
            return self.fail(&mut process, e).await;
        }
        match self
            .downloader
            .download(&self.shutdown, &process.request)
            .await
        {
            Ok(episode) => process.episode = Some(episode),
            Err(e) => return self.fail(&mut process, e).await,
        }
        tracing::info!(
            process_id = %process.id,
            request_id = %process.request.id,
            "Episode downloaded"
        );

        // Publish feed
        process.step = Step::Publishing;
        if let Err(e) = self.update(&mut process).await {
            return self.fail(&mut process, e).await;
        }
        if let Err(e) = self.builder.build(&self.shutdown).await {
            // The episode stays attached and persisted: the media download
            // already succeeded, only the feed regeneration failed.
            return self.fail(&mut process, e).await;
        }

        process.status = Status::Success;
        if let Err(e) = self.update(&mut process).await {
            return self.fail(&mut process, e).await;
        }
    }

    /// Persist the process and broadcast the snapshot
    ///
    /// The snapshot is emitted even when persistence fails, so observers see
    /// the in-memory state of the failure.
    pub(crate) async fn update(&self, process: &mut Process) -> Result<(), Error> {
        let created = !process.id.is_persisted();

        let result = self
            .store
            .process_upsert(process)
            .await
            .map_err(|e| Error::ProcessUpsert(e.to_string()));

        match &result {
            Ok(()) if created => tracing::info!(
                process_id = %process.id,
                step = process.step.as_str(),
                "Process created"
            ),
            Ok(()) => tracing::info!(
                process_id = %process.id,
                step = process.step.as_str(),
                status = process.status.as_str(),
                "Process updated"
            ),
            Err(e) => tracing::error!(
                process_id = %process.id,
                error = %e,
                "Failed to persist process"
            ),
        }

        self.send_notify(process);
        result
    }

    /// Mark the process failed with the given error, persist and notify
    ///
    /// Terminal for the process but never for the worker: a second
    /// persistence failure here is only logged.
    pub(crate) async fn fail(&self, process: &mut Process, error: Error) {
        process.status = Status::Failed;
        process.error = Some(ProcessError::from(&error));

        if let Err(e) = self.store.process_upsert(process).await {
            tracing::error!(
                process_id = %process.id,
                error = %e,
                "Failed to persist failed process"
            );
        }
        tracing::error!(
            process_id = %process.id,
            request_id = %process.request.id,
            step = process.step.as_str(),
            error = %error,
            error_code = error.kind().code(),
            "Process failed"
        );

        self.send_notify(process);
    }

    /// Emit a process snapshot on the notification channel
    ///
    /// Never blocks: if the buffer is full or shutdown has fired, the
    /// snapshot is dropped and the drop is logged. Notifications are a
    /// best-effort progress feed, not an event log.
    pub(crate) fn send_notify(&self, process: &Process) {
        if self.shutdown.is_cancelled() {
            tracing::error!(
                process_id = %process.id,
                "Notification dropped: shutdown in progress"
            );
            return;
        }

        use tokio::sync::mpsc::error::TrySendError;
        match self.notify_tx.try_send(process.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::error!(
                    process_id = %process.id,
                    "Notification buffer full, dropping notification"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!(
                    process_id = %process.id,
                    "Notification channel closed, dropping notification"
                );
            }
        }
    }
}
