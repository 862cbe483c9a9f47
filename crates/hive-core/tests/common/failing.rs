//! Repositories that fail on demand

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use hive_db::{
    AccountRepository, AccountRow, CreateAccount, CreateGroup, DbError, DbResult, GroupRepository,
    GroupRow, MemoryStore, PreferencesUpdate, SubscriptionUpdate,
};
use std::sync::Arc;
use uuid::Uuid;

fn injected() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

/// Account repository over a `MemoryStore` that fails reads or writes
/// for chosen accounts
#[derive(Clone)]
pub struct FailingAccounts {
    inner: MemoryStore,
    fail_reads: Arc<DashSet<Uuid>>,
    fail_updates: Arc<DashSet<Uuid>>,
    stale_scan: Arc<DashSet<Uuid>>,
}

#[allow(dead_code)]
impl FailingAccounts {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_reads: Arc::default(),
            fail_updates: Arc::default(),
            stale_scan: Arc::default(),
        }
    }

    pub fn fail_reads_for(&self, id: Uuid) {
        self.fail_reads.insert(id);
    }

    pub fn fail_updates_for(&self, id: Uuid) {
        self.fail_updates.insert(id);
    }

    /// Report `id` from the downgrade scan even when it no longer matches,
    /// as if it changed between the scan and processing
    pub fn include_in_scan(&self, id: Uuid) {
        self.stale_scan.insert(id);
    }
}

#[async_trait]
impl AccountRepository for FailingAccounts {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AccountRow>> {
        if self.fail_reads.contains(&id) {
            return Err(injected());
        }
        AccountRepository::find_by_id(&self.inner, id).await
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> DbResult<Option<AccountRow>> {
        self.inner.find_by_subscription_id(subscription_id).await
    }

    async fn list_all(&self) -> DbResult<Vec<AccountRow>> {
        self.inner.list_all().await
    }

    async fn find_due_for_downgrade(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<AccountRow>> {
        let mut rows = self.inner.find_due_for_downgrade(cutoff).await?;
        for id in self.stale_scan.iter() {
            if rows.iter().all(|r| r.id != *id) {
                if let Some(row) = self.inner.account(*id) {
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }

    async fn find_expiring_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<AccountRow>> {
        self.inner.find_expiring_between(from, until).await
    }

    async fn create(&self, account: CreateAccount) -> DbResult<AccountRow> {
        AccountRepository::create(&self.inner, account).await
    }

    async fn update_subscription(&self, id: Uuid, update: SubscriptionUpdate) -> DbResult<()> {
        if self.fail_updates.contains(&id) {
            return Err(injected());
        }
        self.inner.update_subscription(id, update).await
    }

    async fn set_active_group(&self, id: Uuid, group_id: Option<Uuid>) -> DbResult<()> {
        if self.fail_updates.contains(&id) {
            return Err(injected());
        }
        self.inner.set_active_group(id, group_id).await
    }

    async fn update_preferences(&self, id: Uuid, update: PreferencesUpdate) -> DbResult<()> {
        if self.fail_updates.contains(&id) {
            return Err(injected());
        }
        self.inner.update_preferences(id, update).await
    }
}

/// Group repository whose every call fails
#[derive(Clone, Default)]
pub struct FailingGroups;

#[async_trait]
impl GroupRepository for FailingGroups {
    async fn find_by_id(&self, _id: Uuid) -> DbResult<Option<GroupRow>> {
        Err(injected())
    }

    async fn find_by_creator(&self, _creator_id: Uuid) -> DbResult<Vec<GroupRow>> {
        Err(injected())
    }

    async fn create(&self, _group: CreateGroup) -> DbResult<GroupRow> {
        Err(injected())
    }
}
