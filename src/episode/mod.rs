//! Episode acquisition service.
//!
//! Sits between the pipeline and the media platforms: fills in request
//! defaults, validates the request, dispatches to the first matching
//! platform under a timeout, and persists the resulting episode.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::contracts::{Downloader, Store};
use crate::platforms::Platform;
use crate::types::{Episode, Request};
use crate::utils;

/// Accepted audio quality values, e.g. "192k" or "best"
#[allow(clippy::expect_used)] // static pattern, cannot fail to compile
static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-zA-Z_-]{1,32}$").expect("valid quality regex")
});

/// Turns requests into persisted episodes via registered platforms
pub struct EpisodeService {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    platforms: Vec<Arc<dyn Platform>>,
}

impl EpisodeService {
    /// Create the service with its platform registry
    ///
    /// Platforms are tried in registration order; the first match wins.
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>, platforms: Vec<Arc<dyn Platform>>) -> Self {
        Self {
            config,
            store,
            platforms,
        }
    }

    /// Prepare directories and verify platform tooling
    ///
    /// Creates the public and download directories and empties the download
    /// directory of scratch files left behind by a previous run.
    pub async fn init(&self) -> Result<()> {
        utils::ensure_dir(&self.config.media.public_dir).await?;
        utils::ensure_dir(&self.config.media.download_dir).await?;
        utils::clean_dir(&self.config.media.download_dir).await?;

        futures::future::try_join_all(self.platforms.iter().map(|platform| async move {
            platform.init().await?;
            tracing::info!(platform = platform.id(), "Platform ready");
            Ok::<_, Error>(())
        }))
        .await?;
        Ok(())
    }

    /// Fill unset request fields from configured defaults
    fn apply_defaults(&self, request: &mut Request) {
        if request.format.is_none() {
            request.format = Some(self.config.media.default_format);
        }
        if request.quality.is_none() {
            request.quality = Some(self.config.media.default_quality.clone());
        }
    }

    /// Reject malformed requests before any platform work starts
    fn validate(request: &Request) -> Result<Url> {
        let url = Url::parse(&request.url)
            .map_err(|e| Error::InvalidRequest(format!("unparseable url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidRequest(format!(
                "unsupported url scheme: {}",
                url.scheme()
            )));
        }
        if let Some(quality) = &request.quality {
            if !QUALITY_RE.is_match(quality) {
                return Err(Error::InvalidRequest(format!(
                    "invalid quality value: {quality:?}"
                )));
            }
        }
        Ok(url)
    }

    fn platform_for(&self, url: &Url) -> Result<&Arc<dyn Platform>> {
        self.platforms
            .iter()
            .find(|p| p.matches(url))
            .ok_or(Error::NoMatchingPlatform)
    }
}

#[async_trait]
impl Downloader for EpisodeService {
    async fn download(&self, cancel: &CancellationToken, request: &Request) -> Result<Episode> {
        let mut request = request.clone();
        self.apply_defaults(&mut request);
        let url = Self::validate(&request)?;
        let platform = self.platform_for(&url)?;

        tracing::info!(
            request_id = %request.id,
            platform = platform.id(),
            url = %request.url,
            "Starting media download"
        );
        let download = platform.download(cancel, &request);
        let mut episode = tokio::time::timeout(self.config.pipeline.download_timeout, download)
            .await
            .map_err(|_| {
                Error::DownloadFailed(format!(
                    "timed out after {}s",
                    self.config.pipeline.download_timeout.as_secs()
                ))
            })?
            .map_err(|e| match e {
                e @ Error::DownloadFailed(_) => e,
                other => Error::DownloadFailed(other.to_string()),
            })?;

        self.store
            .episode_create(&mut episode)
            .await
            .map_err(|e| Error::EpisodeCreate(e.to_string()))?;
        tracing::info!(
            request_id = %request.id,
            episode_id = episode.id,
            media_file = %episode.media_file,
            "Episode persisted"
        );
        Ok(episode)
    }
}
