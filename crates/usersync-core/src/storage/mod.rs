//! Database access layer for synchronized users.
//!
//! The webhook layer only sees the [`UserStore`] trait; the PostgreSQL
//! [`users::Repository`] is the production implementation and tests swap in
//! in-memory doubles.

use std::sync::Arc;

use async_trait::async_trait;

pub mod users;

use crate::{
    connection::{ConnectionCache, PgConnector},
    error::Result,
    models::{ExternalId, NewUser, UserRecord, UserUpdate},
};

/// User synchronization operations keyed by provider ID.
///
/// All operations must tolerate repeated delivery of the same event.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Inserts a user. Returns `None` when a user with the same provider ID
    /// already exists.
    async fn create_user(&self, user: NewUser) -> Result<Option<UserRecord>>;

    /// Looks up a user by provider ID.
    async fn find_user(&self, clerk_id: &ExternalId) -> Result<Option<UserRecord>>;

    /// Applies a partial update. Returns `None` when no user matches.
    async fn update_user(
        &self,
        clerk_id: &ExternalId,
        update: UserUpdate,
    ) -> Result<Option<UserRecord>>;

    /// Removes a user. Returns the removed row, or `None` when no user
    /// matched.
    async fn delete_user(&self, clerk_id: &ExternalId) -> Result<Option<UserRecord>>;

    /// Verifies the backing store is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Builds the production store on top of a shared connection cache.
pub fn postgres_store(connections: Arc<ConnectionCache<PgConnector>>) -> Arc<dyn UserStore> {
    Arc::new(users::Repository::new(connections))
}
