//! Worker pool and intake loop.

use super::Pipeline;
use crate::utils;

/// Length of the server-generated request token
const REQUEST_TOKEN_LEN: usize = 10;

impl Pipeline {
    /// Start the worker pool
    ///
    /// Spawns `worker_count` independent workers. Each worker blocks on the
    /// intake queue, assigns the request a fresh token, and runs the state
    /// machine synchronously to completion before pulling the next item.
    /// Workers exit when the shutdown token fires.
    pub fn start(&self) -> Vec<tokio::task::JoinHandle<()>> {
        (0..self.config.pipeline.worker_count.max(1))
            .map(|worker_id| {
                let pipeline = self.clone();
                tokio::spawn(async move { pipeline.worker(worker_id).await })
            })
            .collect()
    }

    /// A single worker loop
    async fn worker(self, worker_id: usize) {
        tracing::info!(worker_id, "Worker started");

        loop {
            // The receiver lock is only held while waiting for the next item;
            // processing happens with the lock released so siblings can pull.
            let request = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                request = async { self.intake_rx.lock().await.recv().await } => {
                    match request {
                        Some(request) => request,
                        None => break, // intake closed on teardown
                    }
                }
            };

            let mut request = request;
            request.id = utils::token(REQUEST_TOKEN_LEN);
            tracing::info!(
                worker_id,
                request_id = %request.id,
                url = %request.url,
                "Received new request"
            );

            self.handle(request).await;
        }

        tracing::info!(worker_id, "Worker stopped");
    }
}
