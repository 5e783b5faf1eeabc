use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{NewUser, User, UserUpdate};
use crate::Result;

/// Durable record store for users.
///
/// Lookups return `Ok(None)` when nothing matches; `Err` is reserved for
/// store failures. Implementations enforce uniqueness of `email` and of
/// present `session_token` / `reset_token` values, reporting violations as
/// `DatabaseError::Duplicate`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_session_token(&self, token: &str) -> Result<Option<User>>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>>;

    /// Inserts a user, assigning a fresh id.
    async fn insert(&self, user: NewUser) -> Result<User>;

    /// Applies `update` to the user with `id`.
    ///
    /// Fails with `DatabaseError::NotFound` if there is no such user.
    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User>;

    /// Releases the store's resources. Further calls may fail.
    async fn close(&self);
}
