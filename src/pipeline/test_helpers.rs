//! Shared test helpers: mock collaborators and pipeline construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{DatabaseError, Error, Result};
use crate::pipeline::Pipeline;
use crate::pipeline::contracts::{Builder, Downloader, Store};
use crate::types::{Episode, MediaType, Process, ProcessId, Request, Status};

/// In-memory [`Store`] recording every upsert, with injectable failures.
#[derive(Default)]
pub(crate) struct MockStore {
    pub state: std::sync::Mutex<MockStoreState>,
    pub fail_upsert: AtomicBool,
    pub fail_count: AtomicBool,
    pub fail_episode_query: AtomicBool,
    pub fail_status_query: AtomicBool,
}

#[derive(Default)]
pub(crate) struct MockStoreState {
    next_id: i64,
    /// Every upsert in order, as it looked when persisted
    pub log: Vec<Process>,
    /// Latest state per process id
    pub current: HashMap<i64, Process>,
    /// Persisted episodes
    pub episodes: Vec<Episode>,
}

impl MockStore {
    pub fn seed_episode(&self, episode: Episode) {
        let mut state = self.state.lock().unwrap();
        let mut episode = episode;
        episode.id = state.episodes.len() as i64 + 1;
        state.episodes.push(episode);
    }

    pub fn seed_in_progress(&self, url: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let mut process = Process::new(Request {
            url: url.to_string(),
            ..Request::default()
        });
        process.id = ProcessId::new(id);
        state.current.insert(id, process);
        id
    }

    /// Latest persisted state for the only process touching `url`
    pub fn current_for_url(&self, url: &str) -> Option<Process> {
        let state = self.state.lock().unwrap();
        state
            .current
            .values()
            .find(|p| p.request.url == url)
            .cloned()
    }

    pub fn log_snapshot(&self) -> Vec<Process> {
        self.state.lock().unwrap().log.clone()
    }

    fn injected(what: &str) -> Error {
        Error::Database(DatabaseError::QueryFailed(format!("injected {what} failure")))
    }
}

#[async_trait]
impl Store for MockStore {
    async fn process_upsert(&self, process: &mut Process) -> Result<()> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(Self::injected("upsert"));
        }
        let mut state = self.state.lock().unwrap();
        if !process.id.is_persisted() {
            state.next_id += 1;
            process.id = ProcessId::new(state.next_id);
        }
        process.updated_at = chrono::Utc::now();
        state.log.push(process.clone());
        state.current.insert(process.id.get(), process.clone());
        Ok(())
    }

    async fn processes_by_status(&self, status: Status) -> Result<Vec<Process>> {
        if self.fail_status_query.load(Ordering::SeqCst) {
            return Err(Self::injected("status query"));
        }
        let state = self.state.lock().unwrap();
        let mut found: Vec<Process> = state
            .current
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        found.sort_by_key(|p| p.id.get());
        Ok(found)
    }

    async fn process_count_by_url_and_status(&self, url: &str, status: Status) -> Result<i64> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(Self::injected("count"));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .current
            .values()
            .filter(|p| p.request.url == url && p.status == status)
            .count() as i64)
    }

    async fn episode_create(&self, episode: &mut Episode) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        episode.id = state.episodes.len() as i64 + 1;
        state.episodes.push(episode.clone());
        Ok(())
    }

    async fn episodes_by_original_url(&self, url: &str) -> Result<Vec<Episode>> {
        if self.fail_episode_query.load(Ordering::SeqCst) {
            return Err(Self::injected("episode query"));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .episodes
            .iter()
            .filter(|e| e.original_url == url)
            .cloned()
            .collect())
    }

    async fn episodes_all(&self) -> Result<Vec<Episode>> {
        let state = self.state.lock().unwrap();
        let mut all = state.episodes.clone();
        all.reverse();
        Ok(all)
    }
}

/// How the mock downloader behaves
pub(crate) enum DownloadMode {
    /// Return an episode derived from the request
    Succeed,
    /// Fail with a download error
    Fail(String),
    /// Park until the cancellation token fires, then fail
    Pending,
}

/// Scripted [`Downloader`] counting its invocations.
pub(crate) struct MockDownloader {
    pub mode: std::sync::Mutex<DownloadMode>,
    pub calls: AtomicUsize,
}

impl MockDownloader {
    pub fn new(mode: DownloadMode) -> Self {
        Self {
            mode: std::sync::Mutex::new(mode),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn download(&self, cancel: &CancellationToken, request: &Request) -> Result<Episode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Decide behavior without holding the lock across an await point
        enum Plan {
            Succeed,
            Fail(String),
            Pending,
        }
        let plan = match &*self.mode.lock().unwrap() {
            DownloadMode::Succeed => Plan::Succeed,
            DownloadMode::Fail(msg) => Plan::Fail(msg.clone()),
            DownloadMode::Pending => Plan::Pending,
        };
        match plan {
            Plan::Succeed => Ok(episode_for(&request.url)),
            Plan::Fail(msg) => Err(Error::DownloadFailed(msg)),
            Plan::Pending => {
                cancel.cancelled().await;
                Err(Error::DownloadFailed("cancelled".to_string()))
            }
        }
    }
}

/// Scripted [`Builder`] counting its invocations.
#[derive(Default)]
pub(crate) struct MockBuilder {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl Builder for MockBuilder {
    async fn build(&self, _cancel: &CancellationToken) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::EmptyFeed);
        }
        Ok(())
    }
}

/// Config tuned for fast tests: tiny admission timeout, single worker.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.pipeline.worker_count = 1;
    config.pipeline.intake_buffer = 1;
    config.pipeline.submit_timeout = std::time::Duration::from_millis(50);
    config
}

pub(crate) fn make_pipeline(
    config: Config,
    store: Arc<MockStore>,
    downloader: Arc<MockDownloader>,
    builder: Arc<MockBuilder>,
) -> Pipeline {
    Pipeline::new(Arc::new(config), store, downloader, builder)
}

pub(crate) fn request_for(url: &str) -> Request {
    Request {
        id: "testtoken1".to_string(),
        user_id: 1,
        chat_id: 2,
        message_id: 3,
        url: url.to_string(),
        format: None,
        quality: None,
        force: false,
    }
}

pub(crate) fn episode_for(url: &str) -> Episode {
    Episode {
        id: 0,
        title: "Episode".to_string(),
        description: "Description".to_string(),
        thumbnail_file: String::new(),
        media_file: "episode.mp3".to_string(),
        media_type: MediaType::Mp3,
        media_duration: 60,
        media_size: 1024,
        author: "Author".to_string(),
        original_url: url.to_string(),
        canonical_url: url.to_string(),
        created_at: chrono::Utc::now(),
    }
}

/// Poll until `cond` holds or two seconds elapse.
pub(crate) async fn wait_until<F: Fn() -> bool>(cond: F) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    while !cond() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached within 2s"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
