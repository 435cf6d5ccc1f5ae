//! Configuration types for podforge

use crate::types::DownloadFormat;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Pipeline concurrency and admission settings
///
/// Groups the knobs of the request-processing core. Used as a nested
/// sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent workers (default: 2)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Intake queue capacity (default: 1)
    ///
    /// Requests beyond this buffer wait in `submit` until a slot frees up or
    /// the admission timeout fires.
    #[serde(default = "default_intake_buffer")]
    pub intake_buffer: usize,

    /// Notification channel capacity (default: 8)
    ///
    /// Snapshots beyond this buffer are dropped, not queued.
    #[serde(default = "default_notify_buffer")]
    pub notify_buffer: usize,

    /// How long `submit` waits for a queue slot before failing busy (default: 2s)
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout: Duration,

    /// Per-download timeout for media acquisition (default: 30 minutes)
    #[serde(default = "default_download_timeout")]
    pub download_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            intake_buffer: default_intake_buffer(),
            notify_buffer: default_notify_buffer(),
            submit_timeout: default_submit_timeout(),
            download_timeout: default_download_timeout(),
        }
    }
}

/// Media acquisition settings (directories, formats, external tools)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Public base URL where the public directory is served (used in the feed)
    #[serde(default = "default_public_url")]
    pub public_url: Url,

    /// Directory where feed and media files are published (default: "./public")
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Scratch directory for in-flight downloads (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Default media format when a request does not specify one
    #[serde(default)]
    pub default_format: DownloadFormat,

    /// Default audio quality when a request does not specify one (default: "192k")
    #[serde(default = "default_quality")]
    pub default_quality: String,

    /// Edge length of the generated square thumbnail in pixels (default: 500)
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,

    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            public_dir: default_public_dir(),
            download_dir: default_download_dir(),
            default_format: DownloadFormat::default(),
            default_quality: default_quality(),
            thumbnail_size: default_thumbnail_size(),
            yt_dlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// One podcast category with optional subcategories
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeedCategory {
    /// Category label
    pub text: String,
    /// Subcategory labels
    #[serde(default)]
    pub subcategories: Vec<String>,
}

/// Published feed metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed file name inside the public directory (default: "podcast.xml")
    #[serde(default = "default_feed_file_name")]
    pub file_name: String,

    /// Show title
    #[serde(default)]
    pub title: String,

    /// Show description
    #[serde(default)]
    pub description: String,

    /// Cover image URL
    #[serde(default)]
    pub image_url: String,

    /// Language code, e.g. "en" (default: "en")
    #[serde(default = "default_language")]
    pub language: String,

    /// Podcast categories
    #[serde(default)]
    pub categories: Vec<FeedCategory>,

    /// Whether the show contains explicit content
    #[serde(default)]
    pub explicit: bool,

    /// Show author
    #[serde(default)]
    pub author: String,

    /// Website link
    #[serde(default)]
    pub website_link: String,

    /// Comma-separated keywords
    #[serde(default)]
    pub keywords: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            file_name: default_feed_file_name(),
            title: String::new(),
            description: String::new(),
            image_url: String::new(),
            language: default_language(),
            categories: Vec::new(),
            explicit: false,
            author: String::new(),
            website_link: String::new(),
            keywords: String::new(),
        }
    }
}

/// Persistence settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path (default: "./podforge.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for podforge
///
/// Fields are organized into logical sub-configs:
/// - [`pipeline`](PipelineConfig) — workers, queues, timeouts
/// - [`media`](MediaConfig) — directories, formats, external tools
/// - [`feed`](FeedConfig) — published feed metadata
/// - [`persistence`](PersistenceConfig) — database location
///
/// Construction-time only: no dynamic reconfiguration is supported.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool and admission settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Media acquisition settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Published feed metadata
    #[serde(default)]
    pub feed: FeedConfig,

    /// Persistence settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

fn default_worker_count() -> usize {
    2
}

fn default_intake_buffer() -> usize {
    1
}

fn default_notify_buffer() -> usize {
    8
}

fn default_submit_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

#[allow(clippy::expect_used)]
fn default_public_url() -> Url {
    // Static string, cannot fail to parse
    Url::parse("http://localhost/").expect("default public url is valid")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_quality() -> String {
    "192k".to_string()
}

fn default_thumbnail_size() -> u32 {
    500
}

fn default_feed_file_name() -> String {
    "podcast.xml".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./podforge.db")
}

fn default_true() -> bool {
    true
}
