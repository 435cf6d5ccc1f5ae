//! Request-processing pipeline: admission, worker pool, state machine,
//! notifications, and crash recovery.
//!
//! The [`Pipeline`] struct and its methods are organized by domain:
//! - [`contracts`] - Collaborator traits (Downloader, Builder, Store)
//! - [`machine`] - The per-request state machine
//! - [`validate`] - Business-rule validation
//! - [`workers`] - Worker pool and intake loop
//! - [`recovery`] - Startup recovery of interrupted processes

pub mod contracts;
mod machine;
mod recovery;
mod validate;
mod workers;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Process, Request};
use contracts::{Builder, Downloader, Store};

/// The request-processing pipeline (cloneable - all fields are Arc-wrapped)
///
/// Lifecycle: construct with [`Pipeline::new`], run [`init`](Pipeline::init)
/// once to recover from a previous crash, then [`start`](Pipeline::start) the
/// worker pool. Requests enter through [`submit`](Pipeline::submit); progress
/// snapshots leave through [`take_notifications`](Pipeline::take_notifications).
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) downloader: Arc<dyn Downloader>,
    pub(crate) builder: Arc<dyn Builder>,
    pub(crate) config: Arc<Config>,
    /// Bounded intake queue; `submit` reserves a slot, workers drain it
    intake_tx: mpsc::Sender<Request>,
    pub(crate) intake_rx: Arc<Mutex<mpsc::Receiver<Request>>>,
    /// Bounded notification channel; full buffer means dropped snapshots
    pub(crate) notify_tx: mpsc::Sender<Process>,
    notify_rx: Arc<std::sync::Mutex<Option<mpsc::Receiver<Process>>>>,
    /// Single shutdown signal shared with workers and collaborator calls
    pub(crate) shutdown: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline from its collaborators
    ///
    /// Channel capacities and the worker count come from
    /// [`PipelineConfig`](crate::config::PipelineConfig).
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        downloader: Arc<dyn Downloader>,
        builder: Arc<dyn Builder>,
    ) -> Self {
        let (intake_tx, intake_rx) = mpsc::channel(config.pipeline.intake_buffer.max(1));
        let (notify_tx, notify_rx) = mpsc::channel(config.pipeline.notify_buffer.max(1));

        Self {
            store,
            downloader,
            builder,
            config,
            intake_tx,
            intake_rx: Arc::new(Mutex::new(intake_rx)),
            notify_tx,
            notify_rx: Arc::new(std::sync::Mutex::new(Some(notify_rx))),
            shutdown: CancellationToken::new(),
        }
    }

    /// Submit a request for processing
    ///
    /// Bounded hand-off: waits for a slot in the intake queue up to the
    /// configured admission timeout, then fails with [`Error::Busy`]. Fails
    /// with [`Error::ShuttingDown`] once shutdown has been signaled. A failed
    /// submit leaves no trace - the request is never persisted.
    pub async fn submit(&self, request: Request) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        tokio::select! {
            permit = self.intake_tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(request);
                    Ok(())
                }
                // All receivers dropped - only happens on teardown
                Err(_) => Err(Error::ShuttingDown),
            },
            _ = tokio::time::sleep(self.config.pipeline.submit_timeout) => {
                tracing::warn!(
                    timeout_ms = self.config.pipeline.submit_timeout.as_millis() as u64,
                    "No worker available within the admission timeout, rejecting request"
                );
                Err(Error::Busy)
            }
            _ = self.shutdown.cancelled() => Err(Error::ShuttingDown),
        }
    }

    /// Take the notification stream
    ///
    /// The pipeline has exactly one consumer; the first call returns the
    /// receiver, every later call returns `None`.
    pub fn take_notifications(&self) -> Option<mpsc::Receiver<Process>> {
        self.notify_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// The shutdown token shared with workers and collaborator calls
    ///
    /// Exposed so embedders can link the pipeline's lifetime to their own
    /// cancellation hierarchy.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Signal shutdown
    ///
    /// Stops admission immediately and lets idle workers exit. In-flight
    /// downloads observe the same token and are expected to stop promptly,
    /// but the pipeline does not forcibly interrupt them.
    pub fn shutdown(&self) {
        tracing::info!("Pipeline shutdown requested");
        self.shutdown.cancel();
    }
}
