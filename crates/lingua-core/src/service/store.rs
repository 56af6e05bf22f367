//! Append-only message and correction stores.
//!
//! Thin data owners the registry and external callers write through. A
//! correction is bound to exactly one message and earns its creator a
//! point through the ledger.

use std::sync::Arc;

use tracing::info;

use lingua_types::error::ChatError;
use lingua_types::message::{Correction, Message, MessageId};
use lingua_types::user::UserId;

use crate::repository::message::MessageRepository;
use crate::repository::user::UserRepository;
use crate::service::ledger::RatingLedger;

/// Append-only store for chat messages.
pub struct MessageStore<M: MessageRepository> {
    message_repo: M,
}

impl<M: MessageRepository> MessageStore<M> {
    pub fn new(message_repo: M) -> Self {
        Self { message_repo }
    }

    /// Persist a new message. Empty text is rejected before persistence.
    pub async fn add_message(&self, author: UserId, text: String) -> Result<Message, ChatError> {
        let message = Message::new(author, text)?;
        self.message_repo.create_message(&message).await?;
        Ok(message)
    }

    /// Get a message with its correction reference set.
    pub async fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>, ChatError> {
        Ok(self.message_repo.get_message(message_id).await?)
    }

    /// Every correction written on this user's messages, newest first --
    /// their collected mistakes.
    pub async fn corrections_for_author(
        &self,
        author: &UserId,
    ) -> Result<Vec<Correction>, ChatError> {
        Ok(self.message_repo.corrections_for_author(author).await?)
    }
}

/// Append-only store for corrections.
pub struct CorrectionStore<M: MessageRepository, U: UserRepository> {
    message_repo: M,
    ledger: Arc<RatingLedger<U>>,
}

impl<M: MessageRepository, U: UserRepository> CorrectionStore<M, U> {
    pub fn new(message_repo: M, ledger: Arc<RatingLedger<U>>) -> Self {
        Self {
            message_repo,
            ledger,
        }
    }

    /// Create a correction attached to `message_id` and award the creator
    /// the correction point.
    ///
    /// Empty phrases are rejected before persistence; a missing message
    /// surfaces as [`ChatError::MessageNotFound`]. The point award runs
    /// after the correction is persisted; if it fails, the correction
    /// stays and the failure is surfaced.
    pub async fn add_correction(
        &self,
        message_id: &MessageId,
        creator: UserId,
        error_phrase: String,
        correct_phrase: String,
        comments: String,
    ) -> Result<Correction, ChatError> {
        let correction = Correction::new(creator.clone(), error_phrase, correct_phrase, comments)?;
        self.message_repo
            .create_correction(message_id, &correction)
            .await?;

        self.ledger
            .award_correction_point(&creator)
            .await
            .map_err(|err| ChatError::Storage(err.to_string()))?;

        info!(message_id = %message_id, correction_id = %correction.id, "correction recorded");
        Ok(correction)
    }
}
