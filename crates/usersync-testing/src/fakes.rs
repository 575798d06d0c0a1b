//! In-memory doubles for the store and the identity provider.
//!
//! Both record every call so tests can assert that a handler ran exactly
//! once with the right arguments, or not at all.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use usersync_core::{
    CoreError, ExternalId, IdentityProvider, NewUser, ProviderError, Result, UserId, UserRecord,
    UserStore, UserUpdate,
};

/// One call made against a [`RecordingUserStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `create_user`
    Create(NewUser),
    /// `find_user`
    Find(ExternalId),
    /// `update_user`
    Update(ExternalId, UserUpdate),
    /// `delete_user`
    Delete(ExternalId),
}

/// Store keeping users in a map, with switchable failures.
#[derive(Debug, Default)]
pub struct RecordingUserStore {
    calls: Mutex<Vec<StoreCall>>,
    users: Mutex<HashMap<ExternalId, UserRecord>>,
    fail_writes: AtomicBool,
    unhealthy: AtomicBool,
}

impl RecordingUserStore {
    /// Creates an empty, healthy store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every create, update, and delete fail with a database error.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Makes `health_check` fail.
    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }

    /// Inserts a row directly, bypassing call recording.
    pub async fn seed(&self, user: NewUser) -> UserRecord {
        let record = to_record(user);
        self.users.lock().await.insert(record.clerk_id.clone(), record.clone());
        record
    }

    /// All calls so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    /// Current row for a provider ID.
    pub async fn user(&self, clerk_id: &ExternalId) -> Option<UserRecord> {
        self.users.lock().await.get(clerk_id).cloned()
    }

    async fn record(&self, call: StoreCall) -> Result<()> {
        self.calls.lock().await.push(call);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Database("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for RecordingUserStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<UserRecord>> {
        self.record(StoreCall::Create(user.clone())).await?;

        let mut users = self.users.lock().await;
        if users.contains_key(&user.clerk_id) {
            return Ok(None);
        }
        let record = to_record(user);
        users.insert(record.clerk_id.clone(), record.clone());
        Ok(Some(record))
    }

    async fn find_user(&self, clerk_id: &ExternalId) -> Result<Option<UserRecord>> {
        self.calls.lock().await.push(StoreCall::Find(clerk_id.clone()));
        Ok(self.users.lock().await.get(clerk_id).cloned())
    }

    async fn update_user(
        &self,
        clerk_id: &ExternalId,
        update: UserUpdate,
    ) -> Result<Option<UserRecord>> {
        self.record(StoreCall::Update(clerk_id.clone(), update.clone())).await?;

        let mut users = self.users.lock().await;
        let Some(record) = users.get_mut(clerk_id) else { return Ok(None) };
        if let Some(first_name) = update.first_name {
            record.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            record.last_name = last_name;
        }
        if let Some(username) = update.username {
            record.username = username;
        }
        if let Some(photo) = update.photo {
            record.photo = photo;
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn delete_user(&self, clerk_id: &ExternalId) -> Result<Option<UserRecord>> {
        self.record(StoreCall::Delete(clerk_id.clone())).await?;
        Ok(self.users.lock().await.remove(clerk_id))
    }

    async fn health_check(&self) -> Result<()> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(CoreError::Connection("injected connection failure".to_string()));
        }
        Ok(())
    }
}

fn to_record(user: NewUser) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id: UserId::new(),
        clerk_id: user.clerk_id,
        email: user.email,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        photo: user.photo,
        created_at: now,
        updated_at: now,
    }
}

/// Identity provider double recording metadata write-backs.
#[derive(Debug, Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<(ExternalId, UserId)>>,
    fail: AtomicBool,
    failures_left: AtomicUsize,
}

impl RecordingProvider {
    /// Creates a provider that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with a 500 from the provider.
    pub fn fail_requests(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Makes only the next `count` calls fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// All write-backs so far, in order.
    pub async fn calls(&self) -> Vec<(ExternalId, UserId)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl IdentityProvider for RecordingProvider {
    async fn set_user_metadata(
        &self,
        clerk_id: &ExternalId,
        user_id: UserId,
    ) -> std::result::Result<(), ProviderError> {
        self.calls.lock().await.push((clerk_id.clone(), user_id));
        let transient = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient || self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Status { status: 500, body: "injected".to_string() });
        }
        Ok(())
    }
}
