//! Document-store collaborators.
//!
//! Single-record reads and writes are atomic. Multi-step sequences built on
//! top of them are not, with one exception: [`UserStore::swap_refresh_credential`]
//! is a conditional update so refresh rotation cannot double-spend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::redemption::{ApproveStatus, RedemptionFilter, RedemptionRecord};
use crate::users::UserRecord;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Conflict(String),
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &value {
            if db.is_unique_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Backend(value.to_string())
    }
}

/// Bounds a store call by `deadline`.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    /// Fails with `Conflict` when the email is already registered.
    async fn insert(&self, user: &UserRecord) -> StoreResult<()>;

    async fn list(&self) -> StoreResult<Vec<UserRecord>>;

    /// Overwrites the stored refresh credential. Returns `false` when the user
    /// does not exist.
    async fn set_refresh_credential(&self, id: Uuid, credential: Option<&str>)
        -> StoreResult<bool>;

    /// Stores a new password hash and clears the refresh credential in one
    /// write. Returns `false` when the user does not exist.
    async fn replace_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;

    /// Replaces the stored refresh credential only if it still equals
    /// `expected`. Returns whether the swap happened.
    async fn swap_refresh_credential(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait RedemptionStore: Send + Sync {
    async fn find_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<RedemptionRecord>>;

    async fn find_by_redeem_id(&self, redeem_id: i64) -> StoreResult<Option<RedemptionRecord>>;

    /// Fails with `Conflict` when `tx_hash` already exists.
    async fn insert(&self, record: &RedemptionRecord) -> StoreResult<()>;

    /// Writes every field of `record` filtered by its `tx_hash`. Returns the
    /// number of records whose content actually changed.
    async fn update(&self, record: &RedemptionRecord) -> StoreResult<u64>;

    /// Returns the number of records whose status actually changed.
    async fn update_status(&self, tx_hash: &str, status: &ApproveStatus) -> StoreResult<u64>;

    async fn list(&self, filter: &RedemptionFilter) -> StoreResult<Vec<RedemptionRecord>>;
}
