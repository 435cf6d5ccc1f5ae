//! Media platforms: pluggable backends that turn a URL into downloaded media.
//!
//! A platform claims URLs via [`Platform::matches`] and produces a fully
//! populated (but not yet persisted) [`Episode`]. The episode service picks
//! the first matching platform in registration order.

mod ytdlp;

pub use ytdlp::YtDlpPlatform;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Result;
use crate::types::{Episode, Request};

/// A media platform backend
#[async_trait]
pub trait Platform: Send + Sync {
    /// Stable identifier used in logs
    fn id(&self) -> &'static str;

    /// Whether this platform handles the given URL
    fn matches(&self, url: &Url) -> bool;

    /// One-time startup check (tool availability, versions)
    async fn init(&self) -> Result<()>;

    /// Download the media behind the request into the public directory
    ///
    /// Returns the episode with all media fields populated; the caller is
    /// responsible for persisting it.
    async fn download(&self, cancel: &CancellationToken, request: &Request) -> Result<Episode>;
}
