use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a user, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new UserId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A registered user of the platform.
///
/// `rating` is the running average of the per-room ratings this user has
/// received, across every room they participate in. `points` is a spendable
/// balance (entering a chat costs points, authoring corrections earns them).
/// Both fields are mutated only through the core services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Freeform display name (duplicates allowed across users).
    pub username: String,
    /// Unique contact address; uniqueness is enforced by storage.
    pub email: String,
    /// Languages the user speaks natively.
    pub native_languages: Vec<String>,
    /// Languages the user is learning.
    pub learning_languages: Vec<String>,
    /// Short freeform self-description.
    pub about: String,
    /// Running average rating, 0 <= rating <= 5. Zero until the user joins
    /// their first room.
    pub rating: f64,
    /// Point balance. Starts at `STARTING_POINTS`.
    pub points: i64,
    /// Ids of the distinct users who have reported this user.
    pub reports: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Points granted to every new account.
pub const STARTING_POINTS: i64 = 50;

/// Points deducted when entering a chat room.
pub const CHAT_ENTRY_COST: i64 = 10;

/// Points earned for authoring a correction.
pub const CORRECTION_REWARD: i64 = 1;

/// Number of distinct reports at which a user is banned.
pub const REPORTS_THRESHOLD_FOR_BAN: usize = 3;

impl User {
    /// Whether this user has crossed the report threshold and is banned.
    pub fn is_banned(&self) -> bool {
        self.reports.len() >= REPORTS_THRESHOLD_FOR_BAN
    }
}

/// Signup form for creating a user.
///
/// Credentials are handled by the external auth layer; the core only
/// receives the profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub native_languages: Vec<String>,
    #[serde(default)]
    pub learning_languages: Vec<String>,
    #[serde(default)]
    pub about: Option<String>,
}
