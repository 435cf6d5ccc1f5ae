//! Process upsert and queries.

use crate::error::DatabaseError;
use crate::types::{Process, ProcessId, Status};
use crate::{Error, Result};

use super::{Database, ProcessRow, timestamp_to_datetime};

const PROCESS_COLUMNS: &str = "id, request_id, request_user_id, request_chat_id, \
     request_message_id, request_url, request_format, request_quality, request_force, \
     step, status, error_code, error_message, episode_id, created_at, updated_at";

impl Database {
    /// Create or update a process record
    ///
    /// A process with an unassigned id is inserted; the store-assigned id and
    /// timestamps are written back onto the value. Persisted processes are
    /// updated in place with a fresh `updated_at`.
    pub async fn upsert_process(&self, process: &mut Process) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let error_code = process.error.as_ref().map(|e| e.kind.code() as i64);
        let error_message = process.error.as_ref().map(|e| e.message.clone());
        let episode_id = process.episode.as_ref().map(|e| e.id);
        let format = process.request.format.map(|f| f.as_str().to_string());

        if !process.id.is_persisted() {
            let result = sqlx::query(
                r#"
                INSERT INTO processes (
                    request_id, request_user_id, request_chat_id, request_message_id,
                    request_url, request_format, request_quality, request_force,
                    step, status, error_code, error_message, episode_id,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&process.request.id)
            .bind(process.request.user_id)
            .bind(process.request.chat_id)
            .bind(process.request.message_id)
            .bind(&process.request.url)
            .bind(&format)
            .bind(&process.request.quality)
            .bind(process.request.force)
            .bind(process.step.as_str())
            .bind(process.status.as_str())
            .bind(error_code)
            .bind(&error_message)
            .bind(episode_id)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert process: {}",
                    e
                )))
            })?;

            process.id = ProcessId::new(result.last_insert_rowid());
            process.created_at = timestamp_to_datetime(now);
            process.updated_at = timestamp_to_datetime(now);
        } else {
            sqlx::query(
                r#"
                UPDATE processes SET
                    request_id = ?, request_user_id = ?, request_chat_id = ?,
                    request_message_id = ?, request_url = ?, request_format = ?,
                    request_quality = ?, request_force = ?,
                    step = ?, status = ?, error_code = ?, error_message = ?,
                    episode_id = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&process.request.id)
            .bind(process.request.user_id)
            .bind(process.request.chat_id)
            .bind(process.request.message_id)
            .bind(&process.request.url)
            .bind(&format)
            .bind(&process.request.quality)
            .bind(process.request.force)
            .bind(process.step.as_str())
            .bind(process.status.as_str())
            .bind(error_code)
            .bind(&error_message)
            .bind(episode_id)
            .bind(now)
            .bind(process.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update process: {}",
                    e
                )))
            })?;

            process.updated_at = timestamp_to_datetime(now);
        }

        Ok(())
    }

    /// List all processes with a given status, episodes attached
    pub async fn processes_by_status(&self, status: Status) -> Result<Vec<Process>> {
        let rows = sqlx::query_as::<_, ProcessRow>(&format!(
            "SELECT {PROCESS_COLUMNS} FROM processes WHERE status = ? ORDER BY created_at ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list processes by status: {}",
                e
            )))
        })?;

        let mut processes = Vec::with_capacity(rows.len());
        for row in rows {
            let episode = match row.episode_id {
                Some(id) => self.episode_by_id(id).await?,
                None => None,
            };
            processes.push(row.into_process(episode));
        }
        Ok(processes)
    }

    /// Count processes matching a URL and status
    pub async fn count_processes_by_url_and_status(
        &self,
        url: &str,
        status: Status,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM processes WHERE request_url = ? AND status = ?",
        )
        .bind(url)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to count processes: {}",
                e
            )))
        })?;

        Ok(count)
    }

    /// Get a single process by id (primarily for tests and diagnostics)
    pub async fn process_by_id(&self, id: ProcessId) -> Result<Option<Process>> {
        let row = sqlx::query_as::<_, ProcessRow>(&format!(
            "SELECT {PROCESS_COLUMNS} FROM processes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get process: {}",
                e
            )))
        })?;

        match row {
            Some(row) => {
                let episode = match row.episode_id {
                    Some(id) => self.episode_by_id(id).await?,
                    None => None,
                };
                Ok(Some(row.into_process(episode)))
            }
            None => Ok(None),
        }
    }
}
