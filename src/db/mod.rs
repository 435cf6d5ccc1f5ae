//! Database layer for podforge
//!
//! Handles SQLite persistence for processes and episodes.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`processes`] — Process upsert and queries
//! - [`episodes`] — Episode CRUD

use crate::error::ProcessError;
use crate::types::{
    DownloadFormat, Episode, MediaType, Process, ProcessId, Request, Status, Step,
};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod episodes;
mod migrations;
mod processes;

/// Process record from database
#[derive(Debug, Clone, FromRow)]
pub struct ProcessRow {
    /// Unique database ID
    pub id: i64,
    /// Request token
    pub request_id: String,
    /// Originating user
    pub request_user_id: i64,
    /// Originating chat
    pub request_chat_id: i64,
    /// Originating message
    pub request_message_id: i64,
    /// Target URL
    pub request_url: String,
    /// Requested format (NULL = default)
    pub request_format: Option<String>,
    /// Requested quality (NULL = default)
    pub request_quality: Option<String>,
    /// Whether duplicate checks were bypassed
    pub request_force: bool,
    /// Current step (string-encoded)
    pub step: String,
    /// Current status (string-encoded)
    pub status: String,
    /// Error category code if failed
    pub error_code: Option<i64>,
    /// Error message if failed
    pub error_message: Option<String>,
    /// Attached episode, if the download succeeded
    pub episode_id: Option<i64>,
    /// Unix timestamp when the process was created
    pub created_at: i64,
    /// Unix timestamp of the last upsert
    pub updated_at: i64,
}

impl ProcessRow {
    /// Rebuild a [`Process`] snapshot, attaching the already-loaded episode
    fn into_process(self, episode: Option<Episode>) -> Process {
        let error = self.error_code.map(|code| {
            ProcessError::from_parts(code as u16, self.error_message.unwrap_or_default())
        });
        Process {
            id: ProcessId::new(self.id),
            request: Request {
                id: self.request_id,
                user_id: self.request_user_id,
                chat_id: self.request_chat_id,
                message_id: self.request_message_id,
                url: self.request_url,
                format: self.request_format.as_deref().and_then(DownloadFormat::parse),
                quality: self.request_quality,
                force: self.request_force,
            },
            step: Step::from_str_or_default(&self.step),
            status: Status::from_str_or_default(&self.status),
            error,
            episode,
            created_at: timestamp_to_datetime(self.created_at),
            updated_at: timestamp_to_datetime(self.updated_at),
        }
    }
}

/// Episode record from database
#[derive(Debug, Clone, FromRow)]
pub struct EpisodeRow {
    /// Unique database ID
    pub id: i64,
    /// Episode title
    pub title: String,
    /// Episode description
    pub description: String,
    /// Thumbnail file name (empty if none)
    pub thumbnail_file: String,
    /// Media file name
    pub media_file: String,
    /// MIME type of the media file
    pub media_type: String,
    /// Duration in seconds
    pub media_duration: i64,
    /// Size in bytes
    pub media_size: i64,
    /// Episode author
    pub author: String,
    /// URL the user submitted
    pub original_url: String,
    /// Canonical URL reported by the platform
    pub canonical_url: String,
    /// Unix timestamp when the episode was persisted
    pub created_at: i64,
}

impl From<EpisodeRow> for Episode {
    fn from(row: EpisodeRow) -> Self {
        Episode {
            id: row.id,
            title: row.title,
            description: row.description,
            thumbnail_file: row.thumbnail_file,
            media_file: row.media_file,
            media_type: MediaType::from_str_or_default(&row.media_type),
            media_duration: row.media_duration,
            media_size: row.media_size,
            author: row.author,
            original_url: row.original_url,
            canonical_url: row.canonical_url,
            created_at: timestamp_to_datetime(row.created_at),
        }
    }
}

pub(crate) fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

/// Database handle for podforge
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
