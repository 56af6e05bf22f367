//! Chat room repository trait definition.
//!
//! Rooms are keyed by a canonical unordered-pair key in storage, so lookup
//! by user pair matches in either order and duplicate pairs are rejected
//! at the constraint level.

use lingua_types::error::RepositoryError;
use lingua_types::message::MessageId;
use lingua_types::room::{ChatRoom, RatingEntry, RoomId};
use lingua_types::user::UserId;

/// Repository trait for chat room persistence.
///
/// Implementations live in lingua-infra (e.g., `SqliteChatRoomRepository`).
pub trait ChatRoomRepository: Send + Sync {
    /// Insert a room. Fails with `Conflict` when a room for the same
    /// unordered user pair already exists.
    fn create(
        &self,
        room: &ChatRoom,
    ) -> impl std::future::Future<Output = Result<ChatRoom, RepositoryError>> + Send;

    /// Get a room by id, with its message reference set.
    fn get(
        &self,
        room_id: &RoomId,
    ) -> impl std::future::Future<Output = Result<Option<ChatRoom>, RepositoryError>> + Send;

    /// Find the room shared by two users, regardless of argument order.
    fn find_pair(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<ChatRoom>, RepositoryError>> + Send;

    /// All rooms this user participates in.
    fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<ChatRoom>, RepositoryError>> + Send;

    /// How many rooms this user participates in (pending rooms included).
    fn count_for_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;

    /// Add a message reference to the room's message set. Adding the same
    /// reference twice has no additional effect.
    fn add_message(
        &self,
        room_id: &RoomId,
        message_id: &MessageId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite the room's two rating entries.
    fn set_ratings(
        &self,
        room_id: &RoomId,
        ratings: &[RatingEntry; 2],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Flip a pending room to committed.
    fn mark_committed(
        &self,
        room_id: &RoomId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Rooms whose creation never finished (still pending).
    fn list_pending(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ChatRoom>, RepositoryError>> + Send;

    /// The mean of the rating this user received in each of their rooms,
    /// or `None` when they participate in no rooms. Used by the reconcile
    /// pass to rebuild an aggregate from scratch.
    fn average_rating_for_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<f64>, RepositoryError>> + Send;
}
