//! # podforge
//!
//! Backend library that turns media URLs into podcast episodes.
//!
//! ## Design Philosophy
//!
//! podforge is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Transport-agnostic** - Any frontend (bot, HTTP, CLI) submits requests
//!   and consumes progress notifications
//! - **Crash-safe** - Interrupted work is detected and failed visibly at startup
//! - **Sensible defaults** - Works out of the box with zero configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use podforge::{Config, Database, EpisodeService, FeedService, Pipeline, YtDlpPlatform};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!
//!     let platform: Arc<dyn podforge::Platform> = Arc::new(YtDlpPlatform::new(config.clone())?);
//!     let episodes = Arc::new(EpisodeService::new(
//!         config.clone(),
//!         db.clone(),
//!         vec![platform],
//!     ));
//!     episodes.init().await?;
//!     let feed = Arc::new(FeedService::new(config.clone(), db.clone()));
//!
//!     let pipeline = Pipeline::new(config, db, episodes, feed);
//!     pipeline.init().await?;
//!     let workers = pipeline.start();
//!
//!     // Consume progress notifications
//!     let mut notifications = pipeline.take_notifications().unwrap();
//!     tokio::spawn(async move {
//!         while let Some(process) = notifications.recv().await {
//!             println!("{}: {:?}/{:?}", process.id, process.step, process.status);
//!         }
//!     });
//!
//!     // Run until SIGTERM/SIGINT
//!     podforge::run_with_shutdown(pipeline).await;
//!     for worker in workers {
//!         worker.await?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Episode acquisition service
pub mod episode;
/// Error types
pub mod error;
/// Podcast feed generation
pub mod feed;
/// Request-processing pipeline
pub mod pipeline;
/// Media platform backends
pub mod platforms;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FeedCategory, FeedConfig, MediaConfig, PersistenceConfig, PipelineConfig};
pub use db::Database;
pub use episode::EpisodeService;
pub use error::{DatabaseError, Error, ErrorKind, ProcessError, Result};
pub use feed::FeedService;
pub use pipeline::Pipeline;
pub use pipeline::contracts::{Builder, Downloader, Store};
pub use platforms::{Platform, YtDlpPlatform};
pub use types::{
    DownloadFormat, Episode, MediaType, Process, ProcessId, Request, Status, Step,
};

/// Run the pipeline until a termination signal arrives, then shut it down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(pipeline: Pipeline) {
    wait_for_signal().await;
    pipeline.shutdown();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Handler registration can fail in minimal containers and test sandboxes;
    // degrade to whichever signal is still available before giving up.
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "Termination signal received"),
                _ = sigint.recv() => tracing::info!(signal = "SIGINT", "Termination signal received"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, listening for SIGTERM only");
            sigterm.recv().await;
            tracing::info!(signal = "SIGTERM", "Termination signal received");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for SIGINT only");
            sigint.recv().await;
            tracing::info!(signal = "SIGINT", "Termination signal received");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "No unix signal handlers available, falling back to ctrl_c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Ctrl+C received");
}
