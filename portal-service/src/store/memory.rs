use std::collections::{BTreeMap, HashMap};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RedemptionStore, StoreError, StoreResult, UserStore};
use crate::redemption::{ApproveStatus, RedemptionFilter, RedemptionRecord};
use crate::users::UserRecord;

/// Process-local store used by tests and local runs without Postgres.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, UserRecord>>,
    redemptions: RwLock<BTreeMap<String, RedemptionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn insert(&self, user: &UserRecord) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {}", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<UserRecord>> {
        let users = self.users.read().await;
        let mut all: Vec<UserRecord> = users.values().cloned().collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(all)
    }

    async fn set_refresh_credential(
        &self,
        id: Uuid,
        credential: Option<&str>,
    ) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.refresh_token = credential.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.refresh_token = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn swap_refresh_credential(
        &self,
        id: Uuid,
        expected: &str,
        next: &str,
    ) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) if user.refresh_token.as_deref() == Some(expected) => {
                user.refresh_token = Some(next.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl RedemptionStore for InMemoryStore {
    async fn find_by_tx_hash(&self, tx_hash: &str) -> StoreResult<Option<RedemptionRecord>> {
        let redemptions = self.redemptions.read().await;
        Ok(redemptions.get(tx_hash).cloned())
    }

    async fn find_by_redeem_id(&self, redeem_id: i64) -> StoreResult<Option<RedemptionRecord>> {
        let redemptions = self.redemptions.read().await;
        Ok(redemptions
            .values()
            .find(|record| record.redeem_id == redeem_id)
            .cloned())
    }

    async fn insert(&self, record: &RedemptionRecord) -> StoreResult<()> {
        let mut redemptions = self.redemptions.write().await;
        if redemptions.contains_key(&record.tx_hash) {
            return Err(StoreError::Conflict(format!("tx_hash {}", record.tx_hash)));
        }
        redemptions.insert(record.tx_hash.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &RedemptionRecord) -> StoreResult<u64> {
        let mut redemptions = self.redemptions.write().await;
        match redemptions.get_mut(&record.tx_hash) {
            Some(stored) if stored != record => {
                *stored = record.clone();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update_status(&self, tx_hash: &str, status: &ApproveStatus) -> StoreResult<u64> {
        let mut redemptions = self.redemptions.write().await;
        match redemptions.get_mut(tx_hash) {
            Some(stored) if stored.approve_status != *status => {
                stored.approve_status = status.clone();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn list(&self, filter: &RedemptionFilter) -> StoreResult<Vec<RedemptionRecord>> {
        let redemptions = self.redemptions.read().await;
        Ok(redemptions
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}
