//! User repository trait definition.

use lingua_types::error::RepositoryError;
use lingua_types::user::{User, UserId};

/// Repository trait for user persistence.
///
/// Implementations live in lingua-infra (e.g., `SqliteUserRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait UserRepository: Send + Sync {
    /// Create a new user. Fails with `Conflict` when the email is taken.
    fn create(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Get a user by id.
    fn get(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Overwrite the user's stored aggregate rating.
    fn set_rating(
        &self,
        user_id: &UserId,
        rating: f64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite the user's point balance.
    fn set_points(
        &self,
        user_id: &UserId,
        points: i64,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Read just the point balance.
    fn get_points(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Record that `reporter` reported `user_id`. Inserting the same
    /// reporter twice has no additional effect.
    fn add_report(
        &self,
        user_id: &UserId,
        reporter: &UserId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All users other than `user_id` who are not banned, as potential
    /// conversation partners.
    fn list_pen_pals(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;
}
