//! SQLite chat room repository implementation.
//!
//! Rooms store their two participants and the two per-participant ratings
//! in paired columns, plus the canonical `pair_key` with a UNIQUE
//! constraint -- the registry's duplicate-pair rejection bottoms out here.
//! Message references live in a companion set table with a composite
//! primary key, so duplicate adds are ignored.

use chrono::{DateTime, Utc};
use sqlx::Row;

use lingua_core::repository::room::ChatRoomRepository;
use lingua_types::error::RepositoryError;
use lingua_types::message::MessageId;
use lingua_types::room::{ChatRoom, RatingEntry, RatingScore, RoomId, RoomStatus};
use lingua_types::user::UserId;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRoomRepository`.
pub struct SqliteChatRoomRepository {
    pool: DatabasePool,
}

impl SqliteChatRoomRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn load_messages(&self, room_id: &RoomId) -> Result<Vec<MessageId>, RepositoryError> {
        let rows = sqlx::query("SELECT message_id FROM room_messages WHERE room_id = ?")
            .bind(room_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("message_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(
                raw.parse()
                    .map_err(|e| RepositoryError::Query(format!("invalid message_id: {e}")))?,
            );
        }
        Ok(messages)
    }

    async fn assemble(&self, row: &sqlx::sqlite::SqliteRow) -> Result<ChatRoom, RepositoryError> {
        let room_row =
            RoomRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        let room_id: RoomId = room_row
            .id
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid room id: {e}")))?;
        let messages = self.load_messages(&room_id).await?;
        room_row.into_room(messages)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain ChatRoom.
struct RoomRow {
    id: String,
    user_a: String,
    user_b: String,
    rating_a: f64,
    rating_b: f64,
    status: String,
    created_at: String,
}

impl RoomRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_a: row.try_get("user_a")?,
            user_b: row.try_get("user_b")?,
            rating_a: row.try_get("rating_a")?,
            rating_b: row.try_get("rating_b")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_room(self, messages: Vec<MessageId>) -> Result<ChatRoom, RepositoryError> {
        let id = self
            .id
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid room id: {e}")))?;
        let user_a: UserId = self
            .user_a
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid user_a: {e}")))?;
        let user_b: UserId = self
            .user_b
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid user_b: {e}")))?;
        let rating_a = RatingScore::new(self.rating_a)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let rating_b = RatingScore::new(self.rating_b)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let status: RoomStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ChatRoom {
            id,
            ratings: [
                RatingEntry {
                    user_id: user_a.clone(),
                    rating_from_room: rating_a,
                },
                RatingEntry {
                    user_id: user_b.clone(),
                    rating_from_room: rating_b,
                },
            ],
            users: [user_a, user_b],
            messages,
            status,
            created_at,
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
// ChatRoomRepository implementation
// ---------------------------------------------------------------------------

impl ChatRoomRepository for SqliteChatRoomRepository {
    async fn create(&self, room: &ChatRoom) -> Result<ChatRoom, RepositoryError> {
        let rating_a = room
            .rating_for(&room.users[0])
            .ok_or_else(|| RepositoryError::Query("missing rating for user_a".to_string()))?;
        let rating_b = room
            .rating_for(&room.users[1])
            .ok_or_else(|| RepositoryError::Query("missing rating for user_b".to_string()))?;

        let result = sqlx::query(
            r#"INSERT INTO rooms (id, user_a, user_b, pair_key, rating_a, rating_b, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(room.id.to_string())
        .bind(room.users[0].to_string())
        .bind(room.users[1].to_string())
        .bind(room.pair_key())
        .bind(rating_a.value())
        .bind(rating_b.value())
        .bind(room.status.to_string())
        .bind(format_datetime(&room.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(room.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(room.pair_key()))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get(&self, room_id: &RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM rooms WHERE id = ?")
            .bind(room_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(self.assemble(&row).await?)),
            None => Ok(None),
        }
    }

    async fn find_pair(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM rooms WHERE pair_key = ?")
            .bind(lingua_types::room::pair_key(user_a, user_b))
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(self.assemble(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ChatRoom>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM rooms WHERE user_a = ? OR user_b = ? ORDER BY created_at ASC")
                .bind(user_id.to_string())
                .bind(user_id.to_string())
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut rooms = Vec::with_capacity(rows.len());
        for row in &rows {
            rooms.push(self.assemble(row).await?);
        }
        Ok(rooms)
    }

    async fn count_for_user(&self, user_id: &UserId) -> Result<u32, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM rooms WHERE user_a = ? OR user_b = ?")
            .bind(user_id.to_string())
            .bind(user_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count as u32)
    }

    async fn add_message(
        &self,
        room_id: &RoomId,
        message_id: &MessageId,
    ) -> Result<(), RepositoryError> {
        let exists = sqlx::query("SELECT 1 FROM rooms WHERE id = ?")
            .bind(room_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("INSERT OR IGNORE INTO room_messages (room_id, message_id) VALUES (?, ?)")
            .bind(room_id.to_string())
            .bind(message_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn set_ratings(
        &self,
        room_id: &RoomId,
        ratings: &[RatingEntry; 2],
    ) -> Result<(), RepositoryError> {
        let row = sqlx::query("SELECT user_a, user_b FROM rooms WHERE id = ?")
            .bind(room_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        let user_a: String = row
            .try_get("user_a")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let user_b: String = row
            .try_get("user_b")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let value_for = |stored: &str| {
            ratings
                .iter()
                .find(|entry| entry.user_id.to_string() == stored)
                .map(|entry| entry.rating_from_room.value())
                .ok_or_else(|| {
                    RepositoryError::Query(format!("no rating entry for participant {stored}"))
                })
        };
        let rating_a = value_for(&user_a)?;
        let rating_b = value_for(&user_b)?;

        sqlx::query("UPDATE rooms SET rating_a = ?, rating_b = ? WHERE id = ?")
            .bind(rating_a)
            .bind(rating_b)
            .bind(room_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn mark_committed(&self, room_id: &RoomId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE rooms SET status = 'committed' WHERE id = ?")
            .bind(room_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<ChatRoom>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM rooms WHERE status = 'pending' ORDER BY created_at ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut rooms = Vec::with_capacity(rows.len());
        for row in &rows {
            rooms.push(self.assemble(row).await?);
        }
        Ok(rooms)
    }

    async fn average_rating_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<f64>, RepositoryError> {
        let average: Option<f64> = sqlx::query_scalar(
            r#"SELECT AVG(CASE WHEN user_a = ? THEN rating_a ELSE rating_b END)
               FROM rooms WHERE user_a = ? OR user_b = ?"#,
        )
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::message::SqliteMessageRepository;
    use crate::sqlite::pool::DatabasePool;
    use crate::sqlite::user::SqliteUserRepository;

    use std::sync::Arc;

    use lingua_core::repository::message::MessageRepository;
    use lingua_core::repository::user::UserRepository;
    use lingua_core::service::ledger::RatingLedger;
    use lingua_core::service::registry::ChatRoomRegistry;
    use lingua_types::error::RoomError;
    use lingua_types::message::Message;
    use lingua_types::user::User;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn seed_user(pool: &DatabasePool, username: &str) -> UserId {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            native_languages: vec![],
            learning_languages: vec![],
            about: String::new(),
            rating: 0.0,
            points: 50,
            reports: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        SqliteUserRepository::new(pool.clone())
            .create(&user)
            .await
            .unwrap();
        user.id
    }

    fn score(value: f64) -> RatingScore {
        RatingScore::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_pair_in_either_order() {
        let pool = test_pool().await;
        let repo = SqliteChatRoomRepository::new(pool.clone());
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;

        let room = ChatRoom::new(a.clone(), b.clone()).unwrap();
        repo.create(&room).await.unwrap();

        let ab = repo.find_pair(&a, &b).await.unwrap().unwrap();
        let ba = repo.find_pair(&b, &a).await.unwrap().unwrap();
        assert_eq!(ab.id, room.id);
        assert_eq!(ba.id, room.id);
        assert_eq!(ab.status, RoomStatus::Pending);
        assert_eq!(ab.rating_for(&a), Some(score(3.0)));
    }

    #[tokio::test]
    async fn test_duplicate_pair_conflicts_even_reversed() {
        let pool = test_pool().await;
        let repo = SqliteChatRoomRepository::new(pool.clone());
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;

        repo.create(&ChatRoom::new(a.clone(), b.clone()).unwrap())
            .await
            .unwrap();
        let err = repo
            .create(&ChatRoom::new(b, a).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_count_and_list_for_user() {
        let pool = test_pool().await;
        let repo = SqliteChatRoomRepository::new(pool.clone());
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;
        let c = seed_user(&pool, "c").await;

        repo.create(&ChatRoom::new(a.clone(), b.clone()).unwrap())
            .await
            .unwrap();
        repo.create(&ChatRoom::new(a.clone(), c.clone()).unwrap())
            .await
            .unwrap();

        assert_eq!(repo.count_for_user(&a).await.unwrap(), 2);
        assert_eq!(repo.count_for_user(&b).await.unwrap(), 1);
        assert_eq!(repo.list_for_user(&a).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_message_is_a_set_insert() {
        let pool = test_pool().await;
        let repo = SqliteChatRoomRepository::new(pool.clone());
        let message_repo = SqliteMessageRepository::new(pool.clone());
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;

        let room = ChatRoom::new(a.clone(), b).unwrap();
        repo.create(&room).await.unwrap();

        let message = Message::new(a, "Hola".to_string()).unwrap();
        message_repo.create_message(&message).await.unwrap();

        repo.add_message(&room.id, &message.id).await.unwrap();
        repo.add_message(&room.id, &message.id).await.unwrap();

        let stored = repo.get(&room.id).await.unwrap().unwrap();
        assert_eq!(stored.messages, vec![message.id]);
    }

    #[tokio::test]
    async fn test_add_message_missing_room() {
        let pool = test_pool().await;
        let repo = SqliteChatRoomRepository::new(pool.clone());

        let err = repo
            .add_message(&RoomId::new(), &MessageId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_set_ratings_and_status_flow() {
        let pool = test_pool().await;
        let repo = SqliteChatRoomRepository::new(pool.clone());
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;

        let room = ChatRoom::new(a.clone(), b.clone()).unwrap();
        repo.create(&room).await.unwrap();
        assert_eq!(repo.list_pending().await.unwrap().len(), 1);

        repo.set_ratings(
            &room.id,
            &[
                RatingEntry {
                    user_id: a.clone(),
                    rating_from_room: score(4.5),
                },
                RatingEntry {
                    user_id: b.clone(),
                    rating_from_room: score(2.0),
                },
            ],
        )
        .await
        .unwrap();

        repo.mark_committed(&room.id).await.unwrap();
        assert!(repo.list_pending().await.unwrap().is_empty());

        let stored = repo.get(&room.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RoomStatus::Committed);
        assert_eq!(stored.rating_for(&a), Some(score(4.5)));
        assert_eq!(stored.rating_for(&b), Some(score(2.0)));
    }

    #[tokio::test]
    async fn test_average_rating_for_user() {
        let pool = test_pool().await;
        let repo = SqliteChatRoomRepository::new(pool.clone());
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;
        let c = seed_user(&pool, "c").await;

        assert_eq!(repo.average_rating_for_user(&a).await.unwrap(), None);

        let room1 = ChatRoom::new(a.clone(), b.clone()).unwrap();
        let room2 = ChatRoom::new(a.clone(), c.clone()).unwrap();
        repo.create(&room1).await.unwrap();
        repo.create(&room2).await.unwrap();

        repo.set_ratings(
            &room1.id,
            &[
                RatingEntry {
                    user_id: a.clone(),
                    rating_from_room: score(5.0),
                },
                RatingEntry {
                    user_id: b.clone(),
                    rating_from_room: score(3.0),
                },
            ],
        )
        .await
        .unwrap();

        // Room 2 still holds the default 3 for a: (5 + 3) / 2 = 4.
        let average = repo.average_rating_for_user(&a).await.unwrap().unwrap();
        assert!((average - 4.0).abs() < 1e-9);
    }

    // -----------------------------------------------------------------------
    // Service-over-SQLite integration
    // -----------------------------------------------------------------------

    fn services(
        pool: &DatabasePool,
    ) -> (
        Arc<RatingLedger<SqliteUserRepository>>,
        ChatRoomRegistry<SqliteChatRoomRepository, SqliteUserRepository, SqliteMessageRepository>,
    ) {
        let ledger = Arc::new(RatingLedger::new(SqliteUserRepository::new(pool.clone())));
        let registry = ChatRoomRegistry::new(
            SqliteChatRoomRepository::new(pool.clone()),
            SqliteMessageRepository::new(pool.clone()),
            ledger.clone(),
        );
        (ledger, registry)
    }

    #[tokio::test]
    async fn test_registry_over_sqlite_create_room_sets_first_room_averages() {
        let pool = test_pool().await;
        let a = seed_user(&pool, "a").await;
        let b = seed_user(&pool, "b").await;
        let (ledger, registry) = services(&pool);

        let room = registry.create_room(a.clone(), b.clone()).await.unwrap();
        assert_eq!(room.status, RoomStatus::Committed);

        let user_a = ledger.get_user(&a).await.unwrap().unwrap();
        let user_b = ledger.get_user(&b).await.unwrap().unwrap();
        assert_eq!(user_a.rating, 3.0);
        assert_eq!(user_b.rating, 3.0);

        assert!(matches!(
            registry.create_room(b, a).await,
            Err(RoomError::DuplicateRoom)
        ));
    }

    #[tokio::test]
    async fn test_registry_over_sqlite_sequential_rating_update() {
        let pool = test_pool().await;
        let x = seed_user(&pool, "x").await;
        let b = seed_user(&pool, "b").await;
        let c = seed_user(&pool, "c").await;
        let (ledger, registry) = services(&pool);

        let room_a = registry.create_room(x.clone(), b.clone()).await.unwrap();
        registry.create_room(x.clone(), c.clone()).await.unwrap();

        // Bring X to average 4 over 2 rooms (room B's entry for X -> 5).
        let room_b = registry.find_room(&x, &c).await.unwrap().unwrap();
        let old = room_b.ratings.clone();
        let mut new = old.clone();
        new.iter_mut()
            .find(|entry| entry.user_id == x)
            .unwrap()
            .rating_from_room = score(5.0);
        registry
            .update_rating(&room_b.id, &x, &old, &new)
            .await
            .unwrap();
        assert_eq!(ledger.get_user(&x).await.unwrap().unwrap().rating, 4.0);

        // Room A's entry for X moves 3 -> 5: (4*2 - 3 + 5)/2 = 5.
        let old = room_a.ratings.clone();
        let mut new = old.clone();
        new.iter_mut()
            .find(|entry| entry.user_id == x)
            .unwrap()
            .rating_from_room = score(5.0);
        registry
            .update_rating(&room_a.id, &x, &old, &new)
            .await
            .unwrap();
        assert_eq!(ledger.get_user(&x).await.unwrap().unwrap().rating, 5.0);

        let stored = registry.find_room(&x, &b).await.unwrap().unwrap();
        assert_eq!(stored.rating_for(&x), Some(score(5.0)));
    }

    #[tokio::test]
    async fn test_registry_over_sqlite_expanded_view() {
        let pool = test_pool().await;
        let a = seed_user(&pool, "mgebhard").await;
        let b = seed_user(&pool, "emilyG").await;
        let (_ledger, registry) = services(&pool);
        let message_repo = SqliteMessageRepository::new(pool.clone());

        let room = registry.create_room(a.clone(), b.clone()).await.unwrap();

        let message = Message::new(a.clone(), "I love canines".to_string()).unwrap();
        message_repo.create_message(&message).await.unwrap();
        registry.add_message(&room.id, &message.id).await.unwrap();

        let correction = lingua_types::message::Correction::new(
            b.clone(),
            "canines".to_string(),
            "dogs".to_string(),
            "No one says that!".to_string(),
        )
        .unwrap();
        message_repo
            .create_correction(&message.id, &correction)
            .await
            .unwrap();

        let view = registry.get_room(&room.id).await.unwrap();
        assert_eq!(view.users.len(), 2);
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].author.username, "mgebhard");
        assert_eq!(view.messages[0].corrections.len(), 1);
        assert_eq!(view.messages[0].corrections[0].creator.username, "emilyG");
    }
}
