//! Message and correction types.
//!
//! A message is sent by one participant in a room and is immutable except
//! for attaching corrections. A correction annotates exactly one message
//! with an error phrase, its replacement, and a freeform comment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::error::ChatError;
use crate::user::UserId;

/// Unique identifier for a message, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a correction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrectionId(pub Uuid);

impl CorrectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CorrectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A chat message.
///
/// The `corrections` field name is a storage contract external tooling
/// also reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author: UserId,
    pub text: String,
    /// Order-irrelevant set of correction references.
    pub corrections: Vec<CorrectionId>,
    pub date: DateTime<Utc>,
}

impl Message {
    /// Create a message, rejecting empty text.
    pub fn new(author: UserId, text: String) -> Result<Self, ChatError> {
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }
        Ok(Self {
            id: MessageId::new(),
            author,
            text,
            corrections: Vec::new(),
            date: Utc::now(),
        })
    }
}

/// A correction on a message.
///
/// Serialized field names (`errorPhrase`, `correctPhrase`) are a storage
/// contract external tooling also reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub id: CorrectionId,
    pub creator: UserId,
    pub error_phrase: String,
    pub correct_phrase: String,
    pub comments: String,
    pub date: DateTime<Utc>,
}

impl Correction {
    /// Create a correction, rejecting empty phrases. The comment may be
    /// empty.
    pub fn new(
        creator: UserId,
        error_phrase: String,
        correct_phrase: String,
        comments: String,
    ) -> Result<Self, ChatError> {
        if error_phrase.is_empty() || correct_phrase.is_empty() {
            return Err(ChatError::EmptyPhrase);
        }
        Ok(Self {
            id: CorrectionId::new(),
            creator,
            error_phrase,
            correct_phrase,
            comments,
            date: Utc::now(),
        })
    }
}
