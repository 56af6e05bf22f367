//! SQLite user repository implementation.
//!
//! Implements `UserRepository` from `lingua-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, rfc3339 timestamps.
//! Report sets live in a companion table keyed (user, reporter), so
//! re-reporting is an ignored duplicate insert.

use chrono::{DateTime, Utc};
use sqlx::Row;

use lingua_core::repository::user::UserRepository;
use lingua_types::error::RepositoryError;
use lingua_types::user::{REPORTS_THRESHOLD_FOR_BAN, User, UserId};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `UserRepository`.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn load_reports(&self, user_id: &UserId) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT reporter_id FROM user_reports WHERE user_id = ? ORDER BY created_at ASC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut reporters = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("reporter_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            reporters.push(
                raw.parse()
                    .map_err(|e| RepositoryError::Query(format!("invalid reporter_id: {e}")))?,
            );
        }
        Ok(reporters)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain User.
struct UserRow {
    id: String,
    username: String,
    email: String,
    native_languages: String,
    learning_languages: String,
    about: String,
    rating: f64,
    points: i64,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            native_languages: row.try_get("native_languages")?,
            learning_languages: row.try_get("learning_languages")?,
            about: row.try_get("about")?,
            rating: row.try_get("rating")?,
            points: row.try_get("points")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_user(self, reports: Vec<UserId>) -> Result<User, RepositoryError> {
        let id = self
            .id
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
        let native_languages: Vec<String> = serde_json::from_str(&self.native_languages)
            .map_err(|e| RepositoryError::Query(format!("invalid native_languages: {e}")))?;
        let learning_languages: Vec<String> = serde_json::from_str(&self.learning_languages)
            .map_err(|e| RepositoryError::Query(format!("invalid learning_languages: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;
        let updated_at = parse_datetime(&self.updated_at)?;

        Ok(User {
            id,
            username: self.username,
            email: self.email,
            native_languages,
            learning_languages,
            about: self.about,
            rating: self.rating,
            points: self.points,
            reports,
            created_at,
            updated_at,
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
// UserRepository implementation
// ---------------------------------------------------------------------------

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let native_json = serde_json::to_string(&user.native_languages)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let learning_json = serde_json::to_string(&user.learning_languages)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            r#"INSERT INTO users (id, username, email, native_languages, learning_languages, about, rating, points, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&native_json)
        .bind(&learning_json)
        .bind(&user.about)
        .bind(user.rating)
        .bind(user.points)
        .bind(format_datetime(&user.created_at))
        .bind(format_datetime(&user.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(user.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(user.email.clone()))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                let reports = self.load_reports(user_id).await?;
                Ok(Some(user_row.into_user(reports)?))
            }
            None => Ok(None),
        }
    }

    async fn set_rating(&self, user_id: &UserId, rating: f64) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET rating = ?, updated_at = ? WHERE id = ?")
            .bind(rating)
            .bind(format_datetime(&Utc::now()))
            .bind(user_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_points(&self, user_id: &UserId, points: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET points = ?, updated_at = ? WHERE id = ?")
            .bind(points)
            .bind(format_datetime(&Utc::now()))
            .bind(user_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_points(&self, user_id: &UserId) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT points FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        row.try_get("points")
            .map_err(|e| RepositoryError::Query(e.to_string()))
    }

    async fn add_report(&self, user_id: &UserId, reporter: &UserId) -> Result<(), RepositoryError> {
        let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "INSERT OR IGNORE INTO user_reports (user_id, reporter_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id.to_string())
        .bind(reporter.to_string())
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_pen_pals(&self, user_id: &UserId) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM users
               WHERE id != ?
                 AND (SELECT COUNT(*) FROM user_reports WHERE user_reports.user_id = users.id) < ?
               ORDER BY username ASC"#,
        )
        .bind(user_id.to_string())
        .bind(REPORTS_THRESHOLD_FOR_BAN as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            let user_row =
                UserRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            let id: UserId = user_row
                .id
                .parse()
                .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
            let reports = self.load_reports(&id).await?;
            users.push(user_row.into_user(reports)?);
        }
        Ok(users)
    }
}
