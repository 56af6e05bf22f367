use thiserror::Error;

use crate::room::RoomId;

/// Errors from repository operations (used by trait definitions in lingua-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the rating ledger (per-user aggregate rating and points).
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("user not found")]
    UserNotFound,

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("email '{0}' already registered")]
    EmailConflict(String),

    #[error("insufficient points: have {have}, need {need}")]
    InsufficientPoints { have: i64, need: i64 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for LedgerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => LedgerError::UserNotFound,
            other => LedgerError::Storage(other.to_string()),
        }
    }
}

/// Errors from the chat room registry.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("a chat room must contain two different users")]
    SameUser,

    #[error("a chat room for this pair already exists")]
    DuplicateRoom,

    #[error("chat room not found")]
    NotFound,

    #[error("rating {0} is not one of 0, 0.5, 1, ..., 5")]
    InvalidRating(f64),

    #[error("invalid rating entries: {0}")]
    InvalidRatings(String),

    #[error("rating entries do not match the room's participants")]
    ParticipantMismatch,

    /// The room row was written but a participant's aggregate rating was
    /// not updated. The room stays pending until the reconcile pass
    /// repairs it.
    #[error("room {room_id} created but a rating aggregate update failed")]
    LedgerUpdate { room_id: RoomId },

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for RoomError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => RoomError::NotFound,
            RepositoryError::Conflict(_) => RoomError::DuplicateRoom,
            other => RoomError::Storage(other.to_string()),
        }
    }
}

/// Errors from the message and correction stores.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("a message cannot be empty")]
    EmptyText,

    #[error("a correction must name both the error phrase and its replacement")]
    EmptyPhrase,

    #[error("message not found")]
    MessageNotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ChatError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ChatError::MessageNotFound,
            other => ChatError::Storage(other.to_string()),
        }
    }
}
