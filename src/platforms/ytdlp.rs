//! yt-dlp backed platform for YouTube URLs.
//!
//! Shells out to the external `yt-dlp` binary for metadata and media, and to
//! `ffmpeg` for thumbnail processing. Both binaries are resolved at
//! construction time, either from explicit config paths or from PATH.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::Platform;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{DownloadFormat, Episode, Request};
use crate::utils;

/// Hosts this platform claims
const HOSTS: &[&str] = &["youtube.com", "youtu.be"];

/// Platform backed by the external yt-dlp and ffmpeg binaries
pub struct YtDlpPlatform {
    config: Arc<Config>,
    yt_dlp: PathBuf,
    ffmpeg: PathBuf,
}

/// The subset of `yt-dlp -j` output the episode needs
#[derive(Debug, Deserialize)]
struct VideoMeta {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnail: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    uploader: String,
    #[serde(default)]
    webpage_url: String,
}

impl YtDlpPlatform {
    /// Create the platform, resolving both external binaries
    ///
    /// Explicit config paths win; otherwise PATH is searched when
    /// `search_path` is enabled. Fails if either binary cannot be found.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let yt_dlp = resolve_binary("yt-dlp", &config.media.yt_dlp_path, config.media.search_path)?;
        let ffmpeg = resolve_binary("ffmpeg", &config.media.ffmpeg_path, config.media.search_path)?;
        Ok(Self {
            config,
            yt_dlp,
            ffmpeg,
        })
    }

    /// Fetch video metadata without downloading media
    async fn fetch_meta(&self, cancel: &CancellationToken, url: &str) -> Result<VideoMeta> {
        let mut cmd = Command::new(&self.yt_dlp);
        cmd.args(["--no-playlist", "-j", "--no-warnings", "--skip-download"])
            .arg(url);

        let output = run_cancellable(cancel, cmd, "yt-dlp").await?;
        let mut meta: VideoMeta = serde_json::from_slice(&output)?;

        // Sparse uploads come back without title or description
        if meta.title.is_empty() {
            meta.title = meta.uploader.clone();
        }
        if meta.title.is_empty() {
            meta.title = "-".to_string();
        }
        if meta.description.is_empty() {
            meta.description = "-".to_string();
        }
        Ok(meta)
    }

    /// Download and transcode the media into the scratch directory
    async fn fetch_media(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        format: DownloadFormat,
        quality: &str,
        scratch: &Path,
    ) -> Result<PathBuf> {
        let file_name = format!("{}.{}", request.id, format.as_str());
        let out_path = scratch.join(&file_name);

        let mut cmd = Command::new(&self.yt_dlp);
        cmd.arg("--no-playlist")
            .arg("-x")
            .args(["--audio-format", format.as_str()])
            .args(["--audio-quality", quality])
            .arg("--embed-thumbnail")
            .arg("--add-metadata")
            .arg("--force-overwrite")
            .arg("-o")
            .arg(&out_path)
            .args(["--ffmpeg-location"])
            .arg(&self.ffmpeg)
            .arg(&request.url);

        run_cancellable(cancel, cmd, "yt-dlp").await?;
        Ok(out_path)
    }

    /// Crop the remote thumbnail to a square jpg in the scratch directory
    ///
    /// Best effort: a missing or broken thumbnail never fails the download.
    async fn fetch_thumbnail(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        thumbnail_url: &str,
        scratch: &Path,
    ) -> Option<PathBuf> {
        if thumbnail_url.is_empty() {
            return None;
        }
        let size = self.config.media.thumbnail_size;
        let out_path = scratch.join(format!("{}.jpg", request.id));

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-y")
            .arg("-i")
            .arg(thumbnail_url)
            .arg("-vf")
            .arg(format!(
                "crop='min(iw,ih)':'min(iw,ih)',scale={size}:{size}"
            ))
            .arg(&out_path);

        match run_cancellable(cancel, cmd, "ffmpeg").await {
            Ok(_) => Some(out_path),
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    error = %e,
                    "Thumbnail processing failed, continuing without one"
                );
                None
            }
        }
    }
}

#[async_trait]
impl Platform for YtDlpPlatform {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        HOSTS
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    }

    async fn init(&self) -> Result<()> {
        for (name, path, args) in [
            ("yt-dlp", &self.yt_dlp, &["--version"][..]),
            ("ffmpeg", &self.ffmpeg, &["-version"][..]),
        ] {
            let mut cmd = Command::new(path);
            cmd.args(args);
            let output = run_cancellable(&CancellationToken::new(), cmd, name).await?;
            let version = String::from_utf8_lossy(&output);
            tracing::info!(
                tool = name,
                version = version.lines().next().unwrap_or("unknown"),
                "External tool available"
            );
        }
        Ok(())
    }

    async fn download(&self, cancel: &CancellationToken, request: &Request) -> Result<Episode> {
        let format = request.format.unwrap_or(self.config.media.default_format);
        let quality = request
            .quality
            .as_deref()
            .unwrap_or(&self.config.media.default_quality);

        // Per-request scratch directory, removed on every exit path
        let scratch = self
            .config
            .media
            .download_dir
            .join(format!("yt-dlp-{}", request.id));
        utils::ensure_dir(&scratch).await?;

        let result = self
            .download_into(cancel, request, format, quality, &scratch)
            .await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            tracing::warn!(
                request_id = %request.id,
                error = %e,
                "Failed to remove scratch directory"
            );
        }
        result
    }
}

impl YtDlpPlatform {
    async fn download_into(
        &self,
        cancel: &CancellationToken,
        request: &Request,
        format: DownloadFormat,
        quality: &str,
        scratch: &Path,
    ) -> Result<Episode> {
        let meta = self.fetch_meta(cancel, &request.url).await?;
        tracing::info!(
            request_id = %request.id,
            title = %meta.title,
            duration = meta.duration as i64,
            "Video metadata fetched"
        );

        let media_path = self
            .fetch_media(cancel, request, format, quality, scratch)
            .await?;
        let media_size = tokio::fs::metadata(&media_path).await?.len() as i64;

        let thumbnail_path = self
            .fetch_thumbnail(cancel, request, &meta.thumbnail, scratch)
            .await;

        // Publish artifacts under their final names
        let media_file = format!("{}.{}", request.id, format.as_str());
        utils::move_file(&media_path, &self.config.media.public_dir.join(&media_file)).await?;

        let mut thumbnail_file = String::new();
        if let Some(path) = thumbnail_path {
            let name = format!("{}.jpg", request.id);
            match utils::move_file(&path, &self.config.media.public_dir.join(&name)).await {
                Ok(()) => thumbnail_file = name,
                Err(e) => tracing::warn!(
                    request_id = %request.id,
                    error = %e,
                    "Failed to publish thumbnail"
                ),
            }
        }

        Ok(Episode {
            id: 0,
            title: meta.title,
            description: meta.description,
            thumbnail_file,
            media_file,
            media_type: format.media_type(),
            media_duration: meta.duration as i64,
            media_size,
            author: meta.uploader,
            original_url: request.url.clone(),
            canonical_url: if meta.webpage_url.is_empty() {
                request.url.clone()
            } else {
                meta.webpage_url
            },
            created_at: chrono::Utc::now(),
        })
    }
}

/// Resolve an external binary from an explicit path or PATH lookup
fn resolve_binary(name: &str, explicit: &Option<PathBuf>, search_path: bool) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    if search_path {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }
    Err(Error::ExternalTool(format!(
        "{name} not found: set an explicit path or install it on PATH"
    )))
}

/// Run a command to completion, killing it if the token fires first
///
/// Returns stdout on success; a non-zero exit becomes an external tool error
/// carrying the tail of stderr.
async fn run_cancellable(
    cancel: &CancellationToken,
    mut cmd: Command,
    tool: &str,
) -> Result<Vec<u8>> {
    cmd.kill_on_drop(true);

    let output = tokio::select! {
        output = cmd.output() => output
            .map_err(|e| Error::ExternalTool(format!("failed to execute {tool}: {e}")))?,
        // Dropping the output future kills the child via kill_on_drop
        _ = cancel.cancelled() => {
            return Err(Error::DownloadFailed(format!("{tool} cancelled by shutdown")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::ExternalTool(format!(
            "{tool} exited with {}: {tail}",
            output.status
        )));
    }
    Ok(output.stdout)
}
