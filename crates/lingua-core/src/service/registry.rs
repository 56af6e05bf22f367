//! The chat room registry: room lifecycle and rating orchestration.
//!
//! Owns the two-party room entities and their invariants, and drives the
//! multi-step operations that touch both a room and its participants'
//! aggregate ratings. Room creation is two-phase: the row is inserted
//! `pending`, both participants' aggregates absorb the default rating, and
//! only then is the room committed. An interrupted creation leaves a
//! pending row that [`ChatRoomRegistry::reconcile_pending`] repairs.

use std::sync::Arc;

use tracing::{info, warn};

use lingua_types::error::RoomError;
use lingua_types::message::MessageId;
use lingua_types::room::{
    ChatRoom, CorrectionView, DEFAULT_ROOM_RATING, MessageView, ParticipantView, RatingEntry,
    RoomId, RoomStatus, RoomView, UserRef, ZERO_RATING,
};
use lingua_types::user::UserId;

use crate::repository::message::MessageRepository;
use crate::repository::room::ChatRoomRepository;
use crate::repository::user::UserRepository;
use crate::service::ledger::RatingLedger;

/// Orchestrates room creation, rating updates, and room reads.
///
/// Generic over the repository traits; holds the shared [`RatingLedger`]
/// it calls for every aggregate recomputation.
pub struct ChatRoomRegistry<R, U, M>
where
    R: ChatRoomRepository,
    U: UserRepository,
    M: MessageRepository,
{
    room_repo: R,
    message_repo: M,
    ledger: Arc<RatingLedger<U>>,
}

impl<R, U, M> ChatRoomRegistry<R, U, M>
where
    R: ChatRoomRepository,
    U: UserRepository,
    M: MessageRepository,
{
    pub fn new(room_repo: R, message_repo: M, ledger: Arc<RatingLedger<U>>) -> Self {
        Self {
            room_repo,
            message_repo,
            ledger,
        }
    }

    // --- Lifecycle ---

    /// Create the room for an unordered user pair, defaulting both
    /// ratings to 3 and folding that default into each participant's
    /// aggregate.
    ///
    /// The pair is checked up front and again by the storage uniqueness
    /// constraint on the canonical pair key, so two concurrent creates for
    /// the same pair cannot both land. If an aggregate update fails after
    /// the room row is written, the room stays `pending` and the caller
    /// sees [`RoomError::LedgerUpdate`]; `reconcile_pending` finishes the
    /// job later.
    pub async fn create_room(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<ChatRoom, RoomError> {
        let room = ChatRoom::new(user_a.clone(), user_b.clone())?;
        room.validate()?;

        if self.room_repo.find_pair(&user_a, &user_b).await?.is_some() {
            return Err(RoomError::DuplicateRoom);
        }

        let mut room = self.room_repo.create(&room).await?;
        info!(room_id = %room.id, "room created, pending aggregate updates");

        for user_id in &room.users {
            // Counts the freshly inserted room: the new entry fills one
            // slot of the enlarged room count.
            let total_rooms = self.room_repo.count_for_user(user_id).await?;
            if let Err(err) = self
                .ledger
                .apply_room_rating(user_id, ZERO_RATING, DEFAULT_ROOM_RATING, total_rooms, true)
                .await
            {
                warn!(
                    room_id = %room.id,
                    user_id = %user_id,
                    error = %err,
                    "aggregate update failed, room left pending"
                );
                return Err(RoomError::LedgerUpdate {
                    room_id: room.id.clone(),
                });
            }
        }

        self.room_repo.mark_committed(&room.id).await?;
        room.status = RoomStatus::Committed;
        info!(room_id = %room.id, "room committed");
        Ok(room)
    }

    /// Finish the creation of rooms whose aggregate updates were
    /// interrupted. Each participant's average is rebuilt from the full
    /// set of stored room ratings, which makes the repair idempotent no
    /// matter how far the original creation got. Returns how many rooms
    /// were committed.
    pub async fn reconcile_pending(&self) -> Result<u32, RoomError> {
        let pending = self.room_repo.list_pending().await?;
        let mut committed = 0;

        for room in pending {
            for user_id in &room.users {
                let average = self.room_repo.average_rating_for_user(user_id).await?;
                self.ledger
                    .overwrite_rating(user_id, average.unwrap_or(0.0))
                    .await
                    .map_err(|_| RoomError::LedgerUpdate {
                        room_id: room.id.clone(),
                    })?;
            }
            self.room_repo.mark_committed(&room.id).await?;
            committed += 1;
            info!(room_id = %room.id, "pending room reconciled");
        }

        Ok(committed)
    }

    /// Add a message reference to the room's message set. Adding the same
    /// reference twice has no additional effect.
    pub async fn add_message(
        &self,
        room_id: &RoomId,
        message_id: &MessageId,
    ) -> Result<(), RoomError> {
        Ok(self.room_repo.add_message(room_id, message_id).await?)
    }

    /// Find the room shared by two users, regardless of argument order.
    pub async fn find_room(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<Option<ChatRoom>, RoomError> {
        Ok(self.room_repo.find_pair(user_a, user_b).await?)
    }

    // --- Ratings ---

    /// Replace the room's rating entries, updating the rated user's
    /// aggregate first.
    ///
    /// `old_ratings` and `new_ratings` are the room's rating pair before
    /// and after the change, matched to `rated_user` by user id. The
    /// aggregate is recomputed from the old value *before* the room's
    /// stored ratings are overwritten -- the overwrite destroys the old
    /// value the delta needs.
    pub async fn update_rating(
        &self,
        room_id: &RoomId,
        rated_user: &UserId,
        old_ratings: &[RatingEntry; 2],
        new_ratings: &[RatingEntry; 2],
    ) -> Result<(), RoomError> {
        let room = self
            .room_repo
            .get(room_id)
            .await?
            .ok_or(RoomError::NotFound)?;

        validate_entries(&room, old_ratings)?;
        validate_entries(&room, new_ratings)?;

        let old = entry_for(old_ratings, rated_user)?;
        let new = entry_for(new_ratings, rated_user)?;

        let total_rooms = self.room_repo.count_for_user(rated_user).await?;
        self.ledger
            .apply_room_rating(
                rated_user,
                old.rating_from_room,
                new.rating_from_room,
                total_rooms,
                false,
            )
            .await
            .map_err(|err| RoomError::Storage(err.to_string()))?;

        self.room_repo.set_ratings(room_id, new_ratings).await?;
        info!(room_id = %room_id, user_id = %rated_user, "room rating updated");
        Ok(())
    }

    // --- Reads ---

    /// Denormalized view of one room for display.
    pub async fn get_room(&self, room_id: &RoomId) -> Result<RoomView, RoomError> {
        let room = self
            .room_repo
            .get(room_id)
            .await?
            .ok_or(RoomError::NotFound)?;
        self.expand(room).await
    }

    /// Denormalized views of every room this user participates in.
    pub async fn rooms_for_user(&self, user_id: &UserId) -> Result<Vec<RoomView>, RoomError> {
        let rooms = self.room_repo.list_for_user(user_id).await?;
        let mut views = Vec::with_capacity(rooms.len());
        for room in rooms {
            views.push(self.expand(room).await?);
        }
        Ok(views)
    }

    async fn expand(&self, room: ChatRoom) -> Result<RoomView, RoomError> {
        let mut users = Vec::with_capacity(room.users.len());
        for user_id in &room.users {
            let user = self
                .ledger
                .get_user(user_id)
                .await
                .map_err(|err| RoomError::Storage(err.to_string()))?
                .ok_or_else(|| {
                    RoomError::Storage(format!(
                        "room {} references missing user {user_id}",
                        room.id
                    ))
                })?;
            users.push(ParticipantView {
                id: user.id,
                username: user.username,
                rating: user.rating,
                reports: user.reports,
            });
        }

        let mut messages = Vec::with_capacity(room.messages.len());
        for message_id in &room.messages {
            let Some(message) = self.message_repo.get_message(message_id).await? else {
                continue;
            };
            let author = self.user_ref(&message.author).await?;

            let mut corrections = Vec::new();
            for correction in self.message_repo.corrections_for_message(message_id).await? {
                let creator = self.user_ref(&correction.creator).await?;
                corrections.push(CorrectionView {
                    id: correction.id,
                    creator,
                    error_phrase: correction.error_phrase,
                    correct_phrase: correction.correct_phrase,
                    comments: correction.comments,
                    date: correction.date,
                });
            }

            messages.push(MessageView {
                id: message.id,
                author,
                text: message.text,
                corrections,
                date: message.date,
            });
        }

        Ok(RoomView {
            id: room.id,
            users,
            ratings: room.ratings,
            messages,
            status: room.status,
            created_at: room.created_at,
        })
    }

    async fn user_ref(&self, user_id: &UserId) -> Result<UserRef, RoomError> {
        let user = self
            .ledger
            .get_user(user_id)
            .await
            .map_err(|err| RoomError::Storage(err.to_string()))?
            .ok_or_else(|| RoomError::Storage(format!("missing user {user_id}")))?;
        Ok(UserRef {
            id: user.id,
            username: user.username,
        })
    }
}

/// Check a rating pair against the room: two entries with distinct user
/// ids, both belonging to the room's participants.
fn validate_entries(room: &ChatRoom, entries: &[RatingEntry; 2]) -> Result<(), RoomError> {
    if entries[0].user_id == entries[1].user_id {
        return Err(RoomError::InvalidRatings(
            "rating entries share a user id".to_string(),
        ));
    }
    for entry in entries {
        if !room.users.contains(&entry.user_id) {
            return Err(RoomError::ParticipantMismatch);
        }
    }
    Ok(())
}

fn entry_for<'a>(
    entries: &'a [RatingEntry; 2],
    user_id: &UserId,
) -> Result<&'a RatingEntry, RoomError> {
    entries
        .iter()
        .find(|entry| &entry.user_id == user_id)
        .ok_or(RoomError::ParticipantMismatch)
}
