//! SQLite message and correction repository implementation.
//!
//! Messages and corrections are append-only. A correction row carries its
//! message's id from the moment it is inserted, which is what "attached to
//! exactly one message" means at the storage level; a message's correction
//! reference set is derived from that column.

use chrono::{DateTime, Utc};
use sqlx::Row;

use lingua_core::repository::message::MessageRepository;
use lingua_types::error::RepositoryError;
use lingua_types::message::{Correction, CorrectionId, Message, MessageId};
use lingua_types::user::UserId;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn load_correction_ids(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<CorrectionId>, RepositoryError> {
        let rows = sqlx::query("SELECT id FROM corrections WHERE message_id = ?")
            .bind(message_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            ids.push(
                raw.parse()
                    .map_err(|e| RepositoryError::Query(format!("invalid correction id: {e}")))?,
            );
        }
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Correction.
struct CorrectionRow {
    id: String,
    creator_id: String,
    error_phrase: String,
    correct_phrase: String,
    comments: String,
    created_at: String,
}

impl CorrectionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            creator_id: row.try_get("creator_id")?,
            error_phrase: row.try_get("error_phrase")?,
            correct_phrase: row.try_get("correct_phrase")?,
            comments: row.try_get("comments")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_correction(self) -> Result<Correction, RepositoryError> {
        let id = self
            .id
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid correction id: {e}")))?;
        let creator = self
            .creator_id
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid creator_id: {e}")))?;
        let date = parse_datetime(&self.created_at)?;

        Ok(Correction {
            id,
            creator,
            error_phrase: self.error_phrase,
            correct_phrase: self.correct_phrase,
            comments: self.comments,
            date,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// MessageRepository implementation
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn create_message(&self, message: &Message) -> Result<Message, RepositoryError> {
        sqlx::query("INSERT INTO messages (id, author_id, text, created_at) VALUES (?, ?, ?, ?)")
            .bind(message.id.to_string())
            .bind(message.author.to_string())
            .bind(&message.text)
            .bind(format_datetime(&message.date))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(message.clone())
    }

    async fn get_message(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(message_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: MessageId = row
            .try_get::<String, _>("id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let author: UserId = row
            .try_get::<String, _>("author_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid author_id: {e}")))?;
        let text: String = row
            .try_get("text")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let date = parse_datetime(
            &row.try_get::<String, _>("created_at")
                .map_err(|e| RepositoryError::Query(e.to_string()))?,
        )?;
        let corrections = self.load_correction_ids(message_id).await?;

        Ok(Some(Message {
            id,
            author,
            text,
            corrections,
            date,
        }))
    }

    async fn create_correction(
        &self,
        message_id: &MessageId,
        correction: &Correction,
    ) -> Result<Correction, RepositoryError> {
        let exists = sqlx::query("SELECT 1 FROM messages WHERE id = ?")
            .bind(message_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r#"INSERT INTO corrections (id, message_id, creator_id, error_phrase, correct_phrase, comments, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(correction.id.to_string())
        .bind(message_id.to_string())
        .bind(correction.creator.to_string())
        .bind(&correction.error_phrase)
        .bind(&correction.correct_phrase)
        .bind(&correction.comments)
        .bind(format_datetime(&correction.date))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(correction.clone())
    }

    async fn corrections_for_message(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<Correction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM corrections WHERE message_id = ? ORDER BY created_at ASC",
        )
        .bind(message_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut corrections = Vec::with_capacity(rows.len());
        for row in &rows {
            let correction_row =
                CorrectionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            corrections.push(correction_row.into_correction()?);
        }
        Ok(corrections)
    }

    async fn corrections_for_author(
        &self,
        author: &UserId,
    ) -> Result<Vec<Correction>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT corrections.* FROM corrections
               JOIN messages ON corrections.message_id = messages.id
               WHERE messages.author_id = ?
               ORDER BY corrections.created_at DESC"#,
        )
        .bind(author.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut corrections = Vec::with_capacity(rows.len());
        for row in &rows {
            let correction_row =
                CorrectionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            corrections.push(correction_row.into_correction()?);
        }
        Ok(corrections)
    }
}
