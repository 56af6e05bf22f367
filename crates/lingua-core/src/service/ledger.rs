//! The rating ledger: per-user aggregate rating and point balance.
//!
//! A user's `rating` is the running average of the rating they received in
//! each room they participate in, recomputed incrementally rather than from
//! full history. The read-compute-write on that aggregate is serialized per
//! user, so two rooms rating the same user concurrently both land.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use lingua_types::error::{LedgerError, RepositoryError};
use lingua_types::room::RatingScore;
use lingua_types::user::{
    CHAT_ENTRY_COST, CORRECTION_REWARD, NewUser, STARTING_POINTS, User, UserId,
};

use crate::repository::user::UserRepository;

/// Owns each user's point balance and running average rating.
///
/// Generic over `UserRepository` to maintain clean architecture --
/// lingua-core never depends on lingua-infra. Constructed once at process
/// start and shared by reference with the services that call it.
pub struct RatingLedger<U: UserRepository> {
    user_repo: U,
    /// One async mutex per user, created on first touch. Guards every
    /// read-compute-write of that user's rating or points.
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl<U: UserRepository> RatingLedger<U> {
    pub fn new(user_repo: U) -> Self {
        Self {
            user_repo,
            locks: DashMap::new(),
        }
    }

    /// Access the user repository.
    pub fn user_repo(&self) -> &U {
        &self.user_repo
    }

    fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // --- Accounts ---

    /// Create a user from the signup form, with the default point balance
    /// and a zero rating (no participation yet).
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, LedgerError> {
        let username = new_user.username.trim().to_string();
        if username.is_empty() {
            return Err(LedgerError::InvalidProfile(
                "username cannot be empty".to_string(),
            ));
        }
        let email = new_user.email.trim().to_string();
        if email.is_empty() {
            return Err(LedgerError::InvalidProfile(
                "email cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username,
            email,
            native_languages: new_user.native_languages,
            learning_languages: new_user.learning_languages,
            about: new_user.about.unwrap_or_default(),
            rating: 0.0,
            points: STARTING_POINTS,
            reports: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let user = self.user_repo.create(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(email) => LedgerError::EmailConflict(email),
            other => LedgerError::Storage(other.to_string()),
        })?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Get a user by id.
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, LedgerError> {
        Ok(self.user_repo.get(user_id).await?)
    }

    /// All other non-banned users, as potential conversation partners.
    pub async fn pen_pals_for(&self, user_id: &UserId) -> Result<Vec<User>, LedgerError> {
        Ok(self.user_repo.list_pen_pals(user_id).await?)
    }

    // --- Aggregate rating ---

    /// Fold one room's rating change into the user's running average.
    ///
    /// With `R = total_rooms` (counting the room being changed):
    /// - no rooms at all: the average is defined as 0;
    /// - `new_room_entry`: `avg' = (avg*(R-1) + new) / R` -- the new room's
    ///   default rating fills one slot of the enlarged room count;
    /// - otherwise: `avg' = (avg*R - old + new) / R` -- a delta replacement
    ///   over the unchanged room count.
    ///
    /// The whole read-compute-write holds the user's lock; a concurrent
    /// update for the same user waits rather than reading a stale average.
    /// Returns the new average.
    pub async fn apply_room_rating(
        &self,
        user_id: &UserId,
        old_score: RatingScore,
        new_score: RatingScore,
        total_rooms: u32,
        new_room_entry: bool,
    ) -> Result<f64, LedgerError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)?;

        let rooms = total_rooms as f64;
        let updated = if total_rooms == 0 {
            0.0
        } else if new_room_entry {
            (user.rating * (rooms - 1.0) + new_score.value()) / rooms
        } else {
            (user.rating * rooms - old_score.value() + new_score.value()) / rooms
        };

        self.user_repo.set_rating(user_id, updated).await?;
        info!(user_id = %user_id, rating = updated, "aggregate rating updated");
        Ok(updated)
    }

    /// Overwrite the user's aggregate with a value recomputed from full
    /// history. Repair path for interrupted multi-step operations; the
    /// incremental formula above is the hot path.
    pub async fn overwrite_rating(
        &self,
        user_id: &UserId,
        average: f64,
    ) -> Result<(), LedgerError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.user_repo.set_rating(user_id, average).await?;
        info!(user_id = %user_id, rating = average, "aggregate rating rebuilt");
        Ok(())
    }

    // --- Points ---

    /// Spend the chat entry cost. Fails without mutation when the balance
    /// is too low. Returns the remaining balance.
    pub async fn enter_chat_room(&self, user_id: &UserId) -> Result<i64, LedgerError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)?;

        if user.points < CHAT_ENTRY_COST {
            return Err(LedgerError::InsufficientPoints {
                have: user.points,
                need: CHAT_ENTRY_COST,
            });
        }

        let remaining = user.points - CHAT_ENTRY_COST;
        self.user_repo.set_points(user_id, remaining).await?;
        Ok(remaining)
    }

    /// Award the correction reward. Returns the new balance.
    pub async fn award_correction_point(&self, user_id: &UserId) -> Result<i64, LedgerError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let user = self
            .user_repo
            .get(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)?;

        let balance = user.points + CORRECTION_REWARD;
        self.user_repo.set_points(user_id, balance).await?;
        Ok(balance)
    }

    /// Read the user's point balance.
    pub async fn points(&self, user_id: &UserId) -> Result<i64, LedgerError> {
        Ok(self.user_repo.get_points(user_id).await?)
    }

    // --- Reports ---

    /// Record a report against a user. Reporting the same user twice from
    /// the same reporter has no additional effect. Returns the distinct
    /// report count.
    pub async fn report_user(
        &self,
        reported: &UserId,
        reporter: &UserId,
    ) -> Result<usize, LedgerError> {
        self.user_repo.add_report(reported, reporter).await?;

        let user = self
            .user_repo
            .get(reported)
            .await?
            .ok_or(LedgerError::UserNotFound)?;
        if user.is_banned() {
            tracing::warn!(user_id = %reported, reports = user.reports.len(), "user crossed ban threshold");
        }
        Ok(user.reports.len())
    }
}
