//! Message and correction repository trait definition.
//!
//! Messages and corrections are append-only; a correction is bound to its
//! message at insert time and never moves.

use lingua_types::error::RepositoryError;
use lingua_types::message::{Correction, Message, MessageId};
use lingua_types::user::UserId;

/// Repository trait for message and correction persistence.
///
/// Implementations live in lingua-infra (e.g., `SqliteMessageRepository`).
pub trait MessageRepository: Send + Sync {
    /// Persist a new message.
    fn create_message(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// Get a message by id, with its correction reference set.
    fn get_message(
        &self,
        message_id: &MessageId,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// Persist a correction attached to `message_id`. Fails with
    /// `NotFound` when the message does not exist.
    fn create_correction(
        &self,
        message_id: &MessageId,
        correction: &Correction,
    ) -> impl std::future::Future<Output = Result<Correction, RepositoryError>> + Send;

    /// All corrections attached to a message, oldest first.
    fn corrections_for_message(
        &self,
        message_id: &MessageId,
    ) -> impl std::future::Future<Output = Result<Vec<Correction>, RepositoryError>> + Send;

    /// All corrections written on messages this user authored, newest
    /// first (their collected mistakes).
    fn corrections_for_author(
        &self,
        author: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Correction>, RepositoryError>> + Send;
}
