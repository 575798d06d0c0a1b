//! Repository for application user rows.
//!
//! Every operation is keyed by the identity provider's user ID and is safe
//! to repeat, so at-least-once webhook delivery never duplicates a row.
//!
//! Expected table:
//!
//! ```sql
//! CREATE TABLE users (
//!     id          UUID PRIMARY KEY,
//!     clerk_id    TEXT NOT NULL UNIQUE,
//!     email       TEXT NOT NULL,
//!     username    TEXT NOT NULL DEFAULT '',
//!     first_name  TEXT NOT NULL DEFAULT '',
//!     last_name   TEXT NOT NULL DEFAULT '',
//!     photo       TEXT NOT NULL DEFAULT '',
//!     created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use tracing::{debug, instrument};

use super::UserStore;
use crate::{
    connection::{ConnectionCache, PgConnector},
    error::Result,
    models::{ExternalId, NewUser, UserId, UserRecord, UserUpdate},
};

const USER_COLUMNS: &str =
    "id, clerk_id, email, username, first_name, last_name, photo, created_at, updated_at";

/// Repository for user database operations.
///
/// Holds no pool of its own; the pool is obtained from the shared
/// [`ConnectionCache`] on each call so the first webhook triggers the connect.
pub struct Repository {
    connections: Arc<ConnectionCache<PgConnector>>,
}

impl Repository {
    /// Creates a new repository backed by the given connection cache.
    pub fn new(connections: Arc<ConnectionCache<PgConnector>>) -> Self {
        Self { connections }
    }

    async fn pool(&self) -> Result<PgPool> {
        self.connections.get().await
    }

    async fn insert_impl<'e, E>(&self, executor: E, user: &NewUser) -> Result<Option<UserRecord>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r"
            INSERT INTO users (id, clerk_id, email, username, first_name, last_name, photo)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (clerk_id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(UserId::new())
        .bind(&user.clerk_id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.photo)
        .fetch_optional(executor)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl UserStore for Repository {
    #[instrument(name = "users.create", skip(self, user), fields(clerk_id = %user.clerk_id))]
    async fn create_user(&self, user: NewUser) -> Result<Option<UserRecord>> {
        let pool = self.pool().await?;
        let record = self.insert_impl(&pool, &user).await?;

        match &record {
            Some(record) => debug!(user_id = %record.id, "User inserted"),
            None => debug!("User already exists, insert skipped"),
        }

        Ok(record)
    }

    #[instrument(name = "users.find", skip(self), fields(clerk_id = %clerk_id))]
    async fn find_user(&self, clerk_id: &ExternalId) -> Result<Option<UserRecord>> {
        let pool = self.pool().await?;
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE clerk_id = $1"
        ))
        .bind(clerk_id)
        .fetch_optional(&pool)
        .await?;

        Ok(user)
    }

    #[instrument(name = "users.update", skip(self, update), fields(clerk_id = %clerk_id))]
    async fn update_user(
        &self,
        clerk_id: &ExternalId,
        update: UserUpdate,
    ) -> Result<Option<UserRecord>> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                username = COALESCE($4, username),
                photo = COALESCE($5, photo),
                updated_at = NOW()
            WHERE clerk_id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(clerk_id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.username)
        .bind(update.photo)
        .fetch_optional(&pool)
        .await?;

        if record.is_none() {
            debug!("No user matched update");
        }

        Ok(record)
    }

    #[instrument(name = "users.delete", skip(self), fields(clerk_id = %clerk_id))]
    async fn delete_user(&self, clerk_id: &ExternalId) -> Result<Option<UserRecord>> {
        let pool = self.pool().await?;
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "DELETE FROM users WHERE clerk_id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(clerk_id)
        .fetch_optional(&pool)
        .await?;

        Ok(record)
    }

    async fn health_check(&self) -> Result<()> {
        let pool = self.pool().await?;
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;

        Ok(())
    }
}
