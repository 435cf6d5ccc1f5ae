//! Episode CRUD operations.

use crate::error::DatabaseError;
use crate::types::Episode;
use crate::{Error, Result};

use super::{Database, EpisodeRow, timestamp_to_datetime};

const EPISODE_COLUMNS: &str = "id, title, description, thumbnail_file, media_file, \
     media_type, media_duration, media_size, author, original_url, canonical_url, created_at";

impl Database {
    /// Insert a new episode record, assigning id and creation time
    pub async fn insert_episode(&self, episode: &mut Episode) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO episodes (
                title, description, thumbnail_file, media_file, media_type,
                media_duration, media_size, author, original_url, canonical_url,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&episode.title)
        .bind(&episode.description)
        .bind(&episode.thumbnail_file)
        .bind(&episode.media_file)
        .bind(episode.media_type.as_str())
        .bind(episode.media_duration)
        .bind(episode.media_size)
        .bind(&episode.author)
        .bind(&episode.original_url)
        .bind(&episode.canonical_url)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert episode: {}",
                e
            )))
        })?;

        episode.id = result.last_insert_rowid();
        episode.created_at = timestamp_to_datetime(now);
        Ok(())
    }

    /// List all episodes, newest first
    pub async fn list_episodes(&self) -> Result<Vec<Episode>> {
        let rows = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list episodes: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(Episode::from).collect())
    }

    /// List episodes matching the originally submitted URL, newest first
    pub async fn episodes_by_original_url(&self, url: &str) -> Result<Vec<Episode>> {
        let rows = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes WHERE original_url = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(url)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query episodes by url: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(Episode::from).collect())
    }

    /// Get a single episode by id
    pub(crate) async fn episode_by_id(&self, id: i64) -> Result<Option<Episode>> {
        let row = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get episode: {}",
                e
            )))
        })?;

        Ok(row.map(Episode::from))
    }
}
