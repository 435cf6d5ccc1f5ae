//! Core types for podforge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

/// Unique identifier for a persisted process
///
/// An id of `0` means the process has not been written to the store yet; the
/// store assigns the real id on first upsert.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProcessId(pub i64);

impl ProcessId {
    /// Create a new ProcessId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Whether the store has assigned an id yet
    pub fn is_persisted(&self) -> bool {
        self.0 != 0
    }
}

impl From<i64> for ProcessId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ProcessId> for i64 {
    fn from(id: ProcessId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProcessId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for ProcessId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ProcessId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ProcessId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Pipeline step a process is currently in
///
/// Steps only ever advance forward: Creating → Downloading → Publishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Process record is being created and validated
    Creating,
    /// Media acquisition is running
    Downloading,
    /// Feed is being regenerated
    Publishing,
}

impl Step {
    /// String encoding used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Creating => "creating",
            Step::Downloading => "downloading",
            Step::Publishing => "publishing",
        }
    }

    /// Decode from the database string encoding
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "downloading" => Step::Downloading,
            "publishing" => Step::Publishing,
            // Unknown values decode to Creating so corrupted rows stay visible
            _ => Step::Creating,
        }
    }
}

/// Terminal-or-running status of a process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Work is still in flight
    InProgress,
    /// Terminal: completed successfully
    Success,
    /// Terminal: failed
    Failed,
}

impl Status {
    /// String encoding used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::InProgress => "in_progress",
            Status::Success => "success",
            Status::Failed => "failed",
        }
    }

    /// Decode from the database string encoding
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "in_progress" => Status::InProgress,
            "success" => Status::Success,
            // Unknown values decode to Failed so corrupted rows surface visibly
            _ => Status::Failed,
        }
    }

    /// Whether this status is terminal (frozen once reached)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::InProgress)
    }
}

/// Media format a request asks for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    /// MP3 audio
    #[default]
    Mp3,
}

impl DownloadFormat {
    /// File extension and yt-dlp audio-format argument
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFormat::Mp3 => "mp3",
        }
    }

    /// MIME type of the resulting media file
    pub fn media_type(&self) -> MediaType {
        match self {
            DownloadFormat::Mp3 => MediaType::Mp3,
        }
    }

    /// Parse from the string encoding; unknown formats are rejected
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mp3" => Some(DownloadFormat::Mp3),
            _ => None,
        }
    }
}

impl std::fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MIME type of a media enclosure
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    /// audio/mpeg
    #[default]
    #[serde(rename = "audio/mpeg")]
    Mp3,
    /// audio/x-m4a
    #[serde(rename = "audio/x-m4a")]
    M4a,
}

impl MediaType {
    /// MIME string used in enclosures and the database
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Mp3 => "audio/mpeg",
            MediaType::M4a => "audio/x-m4a",
        }
    }

    /// Decode from the MIME string; unknown types fall back to audio/mpeg
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "audio/x-m4a" => MediaType::M4a,
            _ => MediaType::Mp3,
        }
    }
}

/// One user-submitted job: convert this URL to a podcast episode
///
/// Built by the transport layer; immutable once submitted. The `id` token is
/// assigned by the worker that picks the request up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Server-generated token, unique per accepted request
    #[serde(default)]
    pub id: String,
    /// Originating user
    pub user_id: i64,
    /// Originating chat
    pub chat_id: i64,
    /// Originating message
    pub message_id: i64,
    /// Target URL to convert
    pub url: String,
    /// Requested media format (None = configured default)
    #[serde(default)]
    pub format: Option<DownloadFormat>,
    /// Requested media quality, e.g. "192k" (None = configured default)
    #[serde(default)]
    pub quality: Option<String>,
    /// Bypass the duplicate and already-exists checks
    #[serde(default)]
    pub force: bool,
}

/// The downloaded-media artifact attached to a successful process
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Store-assigned id (0 until persisted)
    pub id: i64,
    /// Episode title
    pub title: String,
    /// Episode description
    pub description: String,
    /// Thumbnail file name in the public directory (empty if none)
    pub thumbnail_file: String,
    /// Media file name in the public directory
    pub media_file: String,
    /// MIME type of the media file
    pub media_type: MediaType,
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
    /// When the episode was persisted
    pub created_at: DateTime<Utc>,
}

/// The tracked, mutable lifecycle record for one request
///
/// Every mutation is persisted and then broadcast as a snapshot on the
/// notification channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Process {
    /// Store-assigned id (0 until first persisted)
    pub id: ProcessId,
    /// The request this process was created for
    pub request: Request,
    /// Current pipeline step
    pub step: Step,
    /// Current status
    pub status: Status,
    /// Error captured on failure
    pub error: Option<ProcessError>,
    /// Episode attached after a successful download
    pub episode: Option<Episode>,
    /// Set by the store on create
    pub created_at: DateTime<Utc>,
    /// Set by the store on every upsert
    pub updated_at: DateTime<Utc>,
}

impl Process {
    /// Start a fresh process for a request (Step::Creating, Status::InProgress)
    pub fn new(request: Request) -> Self {
        Self {
            id: ProcessId::default(),
            request,
            step: Step::Creating,
            status: Status::InProgress,
            error: None,
            episode: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
