//! Collaborator contracts for the processing pipeline.
//!
//! The state machine only talks to these traits, so each collaborator can be
//! mocked independently when testing the pipeline in isolation.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::types::{Episode, Process, Request, Status};

/// Media acquisition: turns a request into a persisted episode.
///
/// Implementations are expected to honor the cancellation token promptly,
/// since downloads are long-running I/O.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download the media behind the request and return the resulting episode
    async fn download(&self, cancel: &CancellationToken, request: &Request) -> Result<Episode>;
}

/// Feed regeneration: rebuilds the externally published feed from all episodes.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Regenerate the feed
    async fn build(&self, cancel: &CancellationToken) -> Result<()>;
}

/// Persistence used by the pipeline.
///
/// The store is assumed to serialize concurrent access internally; the
/// pipeline takes no locks around these calls.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create or update a process; assigns id and timestamps on create
    async fn process_upsert(&self, process: &mut Process) -> Result<()>;

    /// List processes with the given status (used by recovery)
    async fn processes_by_status(&self, status: Status) -> Result<Vec<Process>>;

    /// Count processes for a URL with the given status (used by validation)
    async fn process_count_by_url_and_status(&self, url: &str, status: Status) -> Result<i64>;

    /// Persist a new episode; assigns id and creation time
    async fn episode_create(&self, episode: &mut Episode) -> Result<()>;

    /// List episodes for an originally submitted URL (used by validation)
    async fn episodes_by_original_url(&self, url: &str) -> Result<Vec<Episode>>;

    /// List all episodes, newest first (used by the feed builder)
    async fn episodes_all(&self) -> Result<Vec<Episode>>;
}

/// Production [`Store`] backed by the SQLite [`Database`](crate::db::Database).
#[async_trait]
impl Store for crate::db::Database {
    async fn process_upsert(&self, process: &mut Process) -> Result<()> {
        self.upsert_process(process).await
    }

    async fn processes_by_status(&self, status: Status) -> Result<Vec<Process>> {
        self.processes_by_status(status).await
    }

    async fn process_count_by_url_and_status(&self, url: &str, status: Status) -> Result<i64> {
        self.count_processes_by_url_and_status(url, status).await
    }

    async fn episode_create(&self, episode: &mut Episode) -> Result<()> {
        self.insert_episode(episode).await
    }

    async fn episodes_by_original_url(&self, url: &str) -> Result<Vec<Episode>> {
        self.episodes_by_original_url(url).await
    }

    async fn episodes_all(&self) -> Result<Vec<Episode>> {
        self.list_episodes().await
    }
}
