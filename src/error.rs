//! Error types for podforge
//!
//! Every error that can surface on a [`Process`](crate::types::Process) snapshot
//! carries a stable [`ErrorKind`] with a numeric code, so transport layers can
//! map failures to user-facing messages without matching on strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for podforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for podforge
#[derive(Debug, Error)]
pub enum Error {
    /// No registered platform matched the request URL
    #[error("no matching platform found")]
    NoMatchingPlatform,

    /// Media acquisition failed (platform error, timeout, cancellation)
    #[error("failed to download episode: {0}")]
    DownloadFailed(String),

    /// Another process for the same URL is already in progress
    #[error("episode already in progress")]
    EpisodeInProgress,

    /// An episode for this URL already exists and the request was not forced
    #[error("episode already exists")]
    EpisodeExists,

    /// The process was left in progress by a previous run and force-failed at startup
    #[error("process was interrupted")]
    ProcessInterrupted,

    /// The feed cannot be built because no episodes exist
    #[error("feed has no items")]
    EmptyFeed,

    /// The request failed business validation before any work was done
    #[error("invalid download request: {0}")]
    InvalidRequest(String),

    /// Persisting a process failed
    #[error("failed to update process: {0}")]
    ProcessUpsert(String),

    /// Counting processes by URL and status failed
    #[error("failed to count processes by url: {0}")]
    ProcessCount(String),

    /// Querying processes by status failed
    #[error("failed to get processes by status: {0}")]
    ProcessQuery(String),

    /// Querying episodes by original URL failed
    #[error("failed to get episodes by original url: {0}")]
    EpisodeQuery(String),

    /// Persisting an episode failed
    #[error("failed to create episode: {0}")]
    EpisodeCreate(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A configured directory is missing or not usable
    #[error("directory error: {0}")]
    DownloadDir(String),

    /// Moving a downloaded artifact into the public directory failed
    #[error("failed to move file: {0}")]
    MoveFile(String),

    /// No worker became available within the admission timeout
    #[error("pipeline is busy: no worker available")]
    Busy,

    /// Shutdown in progress - not accepting new requests
    #[error("shutdown in progress: not accepting new requests")]
    ShuttingDown,

    /// External tool execution failed (yt-dlp, ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Stable category for an [`Error`], suitable for wire transfer and persistence.
///
/// Codes are grouped by origin: 1xx business rules, 2xx store failures,
/// 3xx I/O and admission, 500 everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No platform matched the URL (101)
    NoMatchingPlatform,
    /// Media download failed (102)
    DownloadFailed,
    /// Another process for the URL is in progress (103)
    EpisodeInProgress,
    /// Episode already exists (104)
    EpisodeExists,
    /// Process was interrupted by a crash or restart (105)
    ProcessInterrupted,
    /// Feed has no items (106)
    EmptyFeed,
    /// Request failed validation (107)
    InvalidRequest,
    /// Process persistence failed (201)
    ProcessUpsert,
    /// Process count query failed (202)
    ProcessCount,
    /// Episode query failed (203)
    EpisodeQuery,
    /// Episode persistence failed (204)
    EpisodeCreate,
    /// Process query failed (205)
    ProcessQuery,
    /// Directory missing or unusable (301)
    DownloadDir,
    /// File move failed (303)
    MoveFile,
    /// Admission timed out (304)
    Busy,
    /// Pipeline is shutting down (305)
    ShuttingDown,
    /// Uncategorized internal failure (500)
    Internal,
}

impl ErrorKind {
    /// Numeric code for this error category
    pub fn code(&self) -> u16 {
        match self {
            ErrorKind::NoMatchingPlatform => 101,
            ErrorKind::DownloadFailed => 102,
            ErrorKind::EpisodeInProgress => 103,
            ErrorKind::EpisodeExists => 104,
            ErrorKind::ProcessInterrupted => 105,
            ErrorKind::EmptyFeed => 106,
            ErrorKind::InvalidRequest => 107,
            ErrorKind::ProcessUpsert => 201,
            ErrorKind::ProcessCount => 202,
            ErrorKind::EpisodeQuery => 203,
            ErrorKind::EpisodeCreate => 204,
            ErrorKind::ProcessQuery => 205,
            ErrorKind::DownloadDir => 301,
            ErrorKind::MoveFile => 303,
            ErrorKind::Busy => 304,
            ErrorKind::ShuttingDown => 305,
            ErrorKind::Internal => 500,
        }
    }
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoMatchingPlatform => ErrorKind::NoMatchingPlatform,
            Error::DownloadFailed(_) => ErrorKind::DownloadFailed,
            Error::EpisodeInProgress => ErrorKind::EpisodeInProgress,
            Error::EpisodeExists => ErrorKind::EpisodeExists,
            Error::ProcessInterrupted => ErrorKind::ProcessInterrupted,
            Error::EmptyFeed => ErrorKind::EmptyFeed,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::ProcessUpsert(_) => ErrorKind::ProcessUpsert,
            Error::ProcessCount(_) => ErrorKind::ProcessCount,
            Error::ProcessQuery(_) => ErrorKind::ProcessQuery,
            Error::EpisodeQuery(_) => ErrorKind::EpisodeQuery,
            Error::EpisodeCreate(_) => ErrorKind::EpisodeCreate,
            Error::DownloadDir(_) => ErrorKind::DownloadDir,
            Error::MoveFile(_) => ErrorKind::MoveFile,
            Error::Busy => ErrorKind::Busy,
            Error::ShuttingDown => ErrorKind::ShuttingDown,
            Error::Database(_)
            | Error::Sqlx(_)
            | Error::ExternalTool(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Cloneable error snapshot carried on a [`Process`](crate::types::Process).
///
/// The full [`Error`] is not `Clone` (it wraps sqlx and I/O sources), so the
/// state machine captures the category and rendered message instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessError {
    /// Error category
    pub kind: ErrorKind,
    /// Rendered error message
    pub message: String,
}

impl ProcessError {
    /// Build a snapshot from a stored code and message (used when loading from the database)
    pub fn from_parts(code: u16, message: String) -> Self {
        let kind = match code {
            101 => ErrorKind::NoMatchingPlatform,
            102 => ErrorKind::DownloadFailed,
            103 => ErrorKind::EpisodeInProgress,
            104 => ErrorKind::EpisodeExists,
            105 => ErrorKind::ProcessInterrupted,
            106 => ErrorKind::EmptyFeed,
            107 => ErrorKind::InvalidRequest,
            201 => ErrorKind::ProcessUpsert,
            202 => ErrorKind::ProcessCount,
            203 => ErrorKind::EpisodeQuery,
            204 => ErrorKind::EpisodeCreate,
            205 => ErrorKind::ProcessQuery,
            301 => ErrorKind::DownloadDir,
            303 => ErrorKind::MoveFile,
            304 => ErrorKind::Busy,
            305 => ErrorKind::ShuttingDown,
            _ => ErrorKind::Internal,
        };
        Self { kind, message }
    }
}

impl From<&Error> for ProcessError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
