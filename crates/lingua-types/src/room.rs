//! Chat room types: the two-party room entity, its per-participant rating
//! entries, and the denormalized read views served to display code.
//!
//! A room bundles exactly two distinct users, the rating each received from
//! their partner in this room, and the set of messages exchanged. Any two
//! users share at most one room, matched regardless of argument order via a
//! canonical pair key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::error::RoomError;
use crate::message::{CorrectionId, MessageId};
use crate::user::UserId;

/// Unique identifier for a chat room, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A rating value received from one chat room.
///
/// Restricted to the discrete set {0, 0.5, 1, ..., 5}. The set is a
/// storage-level compatibility contract; construction outside it fails.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RatingScore(f64);

/// Rating assigned to both participants when a room is created, before
/// either party has rated the other.
pub const DEFAULT_ROOM_RATING: RatingScore = RatingScore(3.0);

/// The zero score, used as the "old" value when a room contributes its
/// first rating slot.
pub const ZERO_RATING: RatingScore = RatingScore(0.0);

impl RatingScore {
    /// Validates that `value` is one of 0, 0.5, 1, ..., 5.
    pub fn new(value: f64) -> Result<Self, RoomError> {
        let doubled = value * 2.0;
        if (0.0..=10.0).contains(&doubled) && doubled.fract() == 0.0 {
            Ok(Self(value))
        } else {
            Err(RoomError::InvalidRating(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for RatingScore {
    type Error = RoomError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RatingScore> for f64 {
    fn from(score: RatingScore) -> Self {
        score.0
    }
}

impl fmt::Display for RatingScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The rating one participant received from their partner in this room.
///
/// Serialized field names (`userId`, `ratingFromRoom`) are a storage
/// contract external tooling also reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEntry {
    pub user_id: UserId,
    pub rating_from_room: RatingScore,
}

/// Commit state of a room's creation.
///
/// Rooms are inserted `pending` and flipped to `committed` once both
/// participants' aggregate ratings have absorbed the room's default
/// contribution. A room stuck in `pending` marks an interrupted creation
/// that the reconcile pass repairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Pending,
    Committed,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Pending => write!(f, "pending"),
            RoomStatus::Committed => write!(f, "committed"),
        }
    }
}

impl FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RoomStatus::Pending),
            "committed" => Ok(RoomStatus::Committed),
            other => Err(format!("invalid room status: '{other}'")),
        }
    }
}

impl Default for RoomStatus {
    fn default() -> Self {
        RoomStatus::Pending
    }
}

/// A two-person chat room.
///
/// Invariants (checked by [`ChatRoom::validate`]):
/// - exactly two distinct users;
/// - exactly two rating entries with distinct user ids, one per participant;
/// - rating values in the discrete set (enforced by [`RatingScore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: RoomId,
    pub users: [UserId; 2],
    pub ratings: [RatingEntry; 2],
    /// Order-irrelevant set of message references.
    pub messages: Vec<MessageId>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    /// Create a pending room between two distinct users with both ratings
    /// defaulted to 3.
    pub fn new(user_a: UserId, user_b: UserId) -> Result<Self, RoomError> {
        if user_a == user_b {
            return Err(RoomError::SameUser);
        }
        Ok(Self {
            id: RoomId::new(),
            ratings: [
                RatingEntry {
                    user_id: user_a.clone(),
                    rating_from_room: DEFAULT_ROOM_RATING,
                },
                RatingEntry {
                    user_id: user_b.clone(),
                    rating_from_room: DEFAULT_ROOM_RATING,
                },
            ],
            users: [user_a, user_b],
            messages: Vec::new(),
            status: RoomStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Check the room-level invariants.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.users[0] == self.users[1] {
            return Err(RoomError::SameUser);
        }
        if self.ratings[0].user_id == self.ratings[1].user_id {
            return Err(RoomError::ParticipantMismatch);
        }
        for entry in &self.ratings {
            if !self.users.contains(&entry.user_id) {
                return Err(RoomError::ParticipantMismatch);
            }
        }
        Ok(())
    }

    /// The rating `user_id` received in this room, if they participate.
    pub fn rating_for(&self, user_id: &UserId) -> Option<RatingScore> {
        self.ratings
            .iter()
            .find(|entry| &entry.user_id == user_id)
            .map(|entry| entry.rating_from_room)
    }

    /// Canonical key for this room's unordered user pair.
    pub fn pair_key(&self) -> String {
        pair_key(&self.users[0], &self.users[1])
    }
}

/// Canonical key for an unordered user pair: the two ids sorted, joined
/// with `:`. Lookup and the storage uniqueness constraint both use this,
/// so a pair matches no matter which user is passed first.
pub fn pair_key(a: &UserId, b: &UserId) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

// ---------------------------------------------------------------------------
// Read views
// ---------------------------------------------------------------------------

/// Minimal user reference embedded in expanded views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub username: String,
}

/// Public slice of a participant shown inside a room view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: UserId,
    pub username: String,
    pub rating: f64,
    pub reports: Vec<UserId>,
}

/// A correction expanded with its creator's public identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionView {
    pub id: CorrectionId,
    pub creator: UserRef,
    pub error_phrase: String,
    pub correct_phrase: String,
    pub comments: String,
    pub date: DateTime<Utc>,
}

/// A message expanded with its author and corrections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: MessageId,
    pub author: UserRef,
    pub text: String,
    pub corrections: Vec<CorrectionView>,
    pub date: DateTime<Utc>,
}

/// Denormalized room for display: participants, messages, their authors,
/// corrections, and correction creators, all expanded. Read-only; not part
/// of the consistency-critical path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub id: RoomId,
    pub users: Vec<ParticipantView>,
    pub ratings: [RatingEntry; 2],
    pub messages: Vec<MessageView>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_score_discrete_set() {
        for half_steps in 0..=10 {
            let value = half_steps as f64 / 2.0;
            assert!(RatingScore::new(value).is_ok(), "expected {value} valid");
        }
        assert!(RatingScore::new(3.3).is_err());
        assert!(RatingScore::new(-0.5).is_err());
        assert!(RatingScore::new(5.5).is_err());
        assert!(RatingScore::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rating_score_serde_rejects_off_grid() {
        let score: RatingScore = serde_json::from_str("4.5").unwrap();
        assert_eq!(score.value(), 4.5);
        assert!(serde_json::from_str::<RatingScore>("3.3").is_err());
    }

    #[test]
    fn test_new_room_defaults() {
        let a = UserId::new();
        let b = UserId::new();
        let room = ChatRoom::new(a.clone(), b.clone()).unwrap();

        assert_eq!(room.status, RoomStatus::Pending);
        assert!(room.messages.is_empty());
        assert_eq!(room.rating_for(&a), Some(DEFAULT_ROOM_RATING));
        assert_eq!(room.rating_for(&b), Some(DEFAULT_ROOM_RATING));
        room.validate().unwrap();
    }

    #[test]
    fn test_same_user_rejected() {
        let a = UserId::new();
        assert!(matches!(
            ChatRoom::new(a.clone(), a),
            Err(RoomError::SameUser)
        ));
    }

    #[test]
    fn test_validate_catches_foreign_rating_entry() {
        let a = UserId::new();
        let b = UserId::new();
        let mut room = ChatRoom::new(a, b).unwrap();
        room.ratings[1].user_id = UserId::new();
        assert!(matches!(
            room.validate(),
            Err(RoomError::ParticipantMismatch)
        ));
    }

    #[test]
    fn test_pair_key_order_independent() {
        let a = UserId::new();
        let b = UserId::new();
        assert_eq!(pair_key(&a, &b), pair_key(&b, &a));
        assert_ne!(pair_key(&a, &b), pair_key(&a, &UserId::new()));
    }

    #[test]
    fn test_rating_entry_serde_contract_fields() {
        let entry = RatingEntry {
            user_id: UserId::new(),
            rating_from_room: RatingScore::new(4.5).unwrap(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("userId").is_some());
        assert_eq!(json["ratingFromRoom"], 4.5);
    }

    #[test]
    fn test_room_status_roundtrip() {
        for status in [RoomStatus::Pending, RoomStatus::Committed] {
            let parsed: RoomStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
    }
}
