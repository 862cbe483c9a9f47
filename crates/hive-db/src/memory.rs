//! In-memory repository backend
//!
//! Backs every repository trait with shared `DashMap` tables. All handles
//! cloned from one `MemoryStore` see the same data, so cross-table queries
//! (group creators, cascade steps) behave like their SQL counterparts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::cascade::CascadeStep;
use crate::error::{DbError, DbResult};
use crate::models::{AccessCodeRow, AccountRow, GroupRow, MembershipRow, NotificationRow};
use crate::repo::*;

/// Owned resource row: which table it lives in and the id it hangs off
/// (group id, or list id for list items)
#[derive(Debug, Clone, Copy)]
struct ContentItem {
    step: CascadeStep,
    parent_id: Uuid,
}

/// Shared in-memory tables
#[derive(Default, Clone)]
pub struct MemoryStore {
    accounts: Arc<DashMap<Uuid, AccountRow>>,
    groups: Arc<DashMap<Uuid, GroupRow>>,
    memberships: Arc<DashMap<Uuid, MembershipRow>>,
    access_codes: Arc<DashMap<Uuid, AccessCodeRow>>,
    content: Arc<DashMap<Uuid, ContentItem>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("accounts", &self.accounts.len())
            .field("groups", &self.groups.len())
            .field("memberships", &self.memberships.len())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle this store behind every repository trait
    pub fn repositories(&self) -> Repositories {
        Repositories {
            accounts: Arc::new(self.clone()),
            groups: Arc::new(self.clone()),
            memberships: Arc::new(self.clone()),
            access_codes: Arc::new(self.clone()),
            content: Arc::new(self.clone()),
        }
    }

    pub fn insert_account(&self, account: AccountRow) {
        self.accounts.insert(account.id, account);
    }

    pub fn insert_group(&self, group: GroupRow) {
        self.groups.insert(group.id, group);
    }

    pub fn insert_membership(&self, membership: MembershipRow) {
        self.memberships.insert(membership.id, membership);
    }

    pub fn insert_access_code(&self, code: AccessCodeRow) {
        self.access_codes.insert(code.id, code);
    }

    /// Insert an owned resource row and return its id. `parent_id` is the
    /// group id, or the list id for `CustomListItems`.
    pub fn insert_content(&self, step: CascadeStep, parent_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.content.insert(id, ContentItem { step, parent_id });
        id
    }

    /// Snapshot of one account
    pub fn account(&self, id: Uuid) -> Option<AccountRow> {
        self.accounts.get(&id).map(|a| a.clone())
    }

    /// Snapshot of one access code
    pub fn access_code(&self, id: Uuid) -> Option<AccessCodeRow> {
        self.access_codes.get(&id).map(|c| c.clone())
    }

    pub fn group_exists(&self, id: Uuid) -> bool {
        self.groups.contains_key(&id)
    }

    fn list_ids_of(&self, group_id: Uuid) -> Vec<Uuid> {
        self.content
            .iter()
            .filter(|e| e.step == CascadeStep::CustomLists && e.parent_id == group_id)
            .map(|e| *e.key())
            .collect()
    }

    fn content_ids(&self, step: CascadeStep, group_id: Uuid) -> Vec<Uuid> {
        let parents = match step {
            CascadeStep::CustomListItems => self.list_ids_of(group_id),
            _ => vec![group_id],
        };
        self.content
            .iter()
            .filter(|e| e.step == step && parents.contains(&e.parent_id))
            .map(|e| *e.key())
            .collect()
    }

    fn membership_ids(&self, group_id: Uuid) -> Vec<Uuid> {
        self.memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.id)
            .collect()
    }

    fn access_code_ids(&self, group_id: Uuid) -> Vec<Uuid> {
        self.access_codes
            .iter()
            .filter(|c| c.group_id == group_id)
            .map(|c| c.id)
            .collect()
    }
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AccountRow>> {
        Ok(self.account(id))
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> DbResult<Option<AccountRow>> {
        Ok(self
            .accounts
            .iter()
            .find(|a| a.subscription_id.as_deref() == Some(subscription_id))
            .map(|a| a.clone()))
    }

    async fn list_all(&self) -> DbResult<Vec<AccountRow>> {
        let rows = self.accounts.iter().map(|a| a.clone()).collect();
        Ok(sorted_by(rows, |a: &AccountRow| a.created_at))
    }

    async fn find_due_for_downgrade(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<AccountRow>> {
        let rows = self
            .accounts
            .iter()
            .filter(|a| {
                a.cancel_at_period_end
                    && a.current_period_end.is_some_and(|end| end < cutoff)
                    && a.subscription_tier != "free"
            })
            .map(|a| a.clone())
            .collect();
        Ok(sorted_by(rows, |a: &AccountRow| a.current_period_end))
    }

    async fn find_expiring_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<AccountRow>> {
        let rows = self
            .accounts
            .iter()
            .filter(|a| {
                a.cancel_at_period_end
                    && a.subscription_status.as_deref() == Some("active")
                    && a.current_period_end
                        .is_some_and(|end| end >= from && end < until)
            })
            .map(|a| a.clone())
            .collect();
        Ok(sorted_by(rows, |a: &AccountRow| a.current_period_end))
    }

    async fn create(&self, account: CreateAccount) -> DbResult<AccountRow> {
        let now = Utc::now();
        let row = AccountRow {
            id: account.id,
            email: account.email,
            name: account.name,
            subscription_tier: "free".to_string(),
            subscription_status: None,
            current_period_end: None,
            cancel_at_period_end: false,
            active_group_id: None,
            subscription_id: None,
            customer_id: None,
            timezone: None,
            morning_briefing_time: None,
            evening_wrapup_time: None,
            notifications: NotificationRow {
                notify_subscription_updates: true,
                ..NotificationRow::default()
            },
            created_at: now,
            updated_at: now,
        };
        self.accounts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_subscription(&self, id: Uuid, update: SubscriptionUpdate) -> DbResult<()> {
        let mut account = self.accounts.get_mut(&id).ok_or(DbError::NotFound)?;

        if let Some(tier) = update.tier {
            account.subscription_tier = tier;
        }
        if let Some(status) = update.status {
            account.subscription_status = Some(status);
        }
        if let Some(end) = update.current_period_end {
            account.current_period_end = Some(end);
        }
        if let Some(flag) = update.cancel_at_period_end {
            account.cancel_at_period_end = flag;
        }
        if let Some(sub) = update.subscription_id {
            account.subscription_id = Some(sub);
        }
        if let Some(customer) = update.customer_id {
            account.customer_id = Some(customer);
        }
        account.updated_at = Utc::now();

        Ok(())
    }

    async fn set_active_group(&self, id: Uuid, group_id: Option<Uuid>) -> DbResult<()> {
        if let Some(mut account) = self.accounts.get_mut(&id) {
            account.active_group_id = group_id;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_preferences(&self, id: Uuid, update: PreferencesUpdate) -> DbResult<()> {
        let mut account = self.accounts.get_mut(&id).ok_or(DbError::NotFound)?;

        if let Some(tz) = update.timezone {
            account.timezone = Some(tz);
        }
        if let Some(time) = update.morning_briefing_time {
            account.morning_briefing_time = Some(time);
        }
        if let Some(time) = update.evening_wrapup_time {
            account.evening_wrapup_time = Some(time);
        }
        account.notifications = update.notifications;
        account.updated_at = Utc::now();

        Ok(())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GroupRow>> {
        Ok(self.groups.get(&id).map(|g| g.clone()))
    }

    async fn find_by_creator(&self, creator_id: Uuid) -> DbResult<Vec<GroupRow>> {
        let rows = self
            .groups
            .iter()
            .filter(|g| g.created_by_id == creator_id)
            .map(|g| g.clone())
            .collect();
        Ok(sorted_by(rows, |g: &GroupRow| g.created_at))
    }

    async fn create(&self, group: CreateGroup) -> DbResult<GroupRow> {
        let row = GroupRow {
            id: group.id,
            name: group.name,
            created_by_id: group.created_by_id,
            group_type: group.group_type,
            max_members: group.max_members,
            created_at: Utc::now(),
        };
        self.groups.insert(row.id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn find_by_group(&self, group_id: Uuid) -> DbResult<Vec<MembershipRow>> {
        let rows = self
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.clone())
            .collect();
        Ok(sorted_by(rows, |m: &MembershipRow| m.joined_at))
    }

    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<MembershipRow>> {
        Ok(self
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.clone())
            .collect())
    }

    async fn find_group_creators_for_user(&self, user_id: Uuid) -> DbResult<Vec<Uuid>> {
        let group_ids: Vec<Uuid> = self
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.group_id)
            .collect();

        // Inner join: memberships whose group row is gone contribute nothing
        Ok(group_ids
            .into_iter()
            .filter_map(|id| self.groups.get(&id).map(|g| g.created_by_id))
            .collect())
    }

    async fn count_by_group(&self, group_id: Uuid) -> DbResult<i64> {
        let count = self
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn create(&self, membership: CreateMembership) -> DbResult<MembershipRow> {
        let row = MembershipRow {
            id: membership.id,
            user_id: membership.user_id,
            group_id: membership.group_id,
            creator_id: membership.creator_id,
            is_admin: membership.is_admin,
            joined_at: Utc::now(),
        };
        self.memberships.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> DbResult<u64> {
        let before = self.memberships.len();
        self.memberships.retain(|_, m| m.user_id != user_id);
        Ok((before - self.memberships.len()) as u64)
    }

    async fn delete_member(&self, group_id: Uuid, user_id: Uuid) -> DbResult<u64> {
        let before = self.memberships.len();
        self.memberships
            .retain(|_, m| !(m.group_id == group_id && m.user_id == user_id));
        Ok((before - self.memberships.len()) as u64)
    }
}

#[async_trait]
impl AccessCodeRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> DbResult<Option<AccessCodeRow>> {
        Ok(self
            .access_codes
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.clone()))
    }

    async fn create(&self, code: CreateAccessCode) -> DbResult<AccessCodeRow> {
        let row = AccessCodeRow {
            id: code.id,
            code: code.code,
            group_id: code.group_id,
            created_by_id: code.created_by_id,
            uses_remaining: code.uses_remaining,
            expires_at: code.expires_at,
            created_at: Utc::now(),
        };
        self.access_codes.insert(row.id, row.clone());
        Ok(row)
    }

    async fn consume_use(&self, id: Uuid, now: DateTime<Utc>) -> DbResult<bool> {
        // The entry guard holds the shard lock for the check-and-decrement
        let Some(mut code) = self.access_codes.get_mut(&id) else {
            return Ok(false);
        };
        if code.is_expired(now) || code.is_exhausted() {
            return Ok(false);
        }
        if let Some(n) = code.uses_remaining.as_mut() {
            *n -= 1;
        }
        Ok(true)
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn delete_step(&self, step: CascadeStep, group_id: Uuid) -> DbResult<u64> {
        let removed = match step {
            CascadeStep::AccessCodes => {
                let ids = self.access_code_ids(group_id);
                ids.iter()
                    .filter(|id| self.access_codes.remove(id).is_some())
                    .count()
            }
            CascadeStep::Memberships => {
                let ids = self.membership_ids(group_id);
                ids.iter()
                    .filter(|id| self.memberships.remove(id).is_some())
                    .count()
            }
            CascadeStep::Group => usize::from(self.groups.remove(&group_id).is_some()),
            _ => {
                let ids = self.content_ids(step, group_id);
                ids.iter()
                    .filter(|id| self.content.remove(id).is_some())
                    .count()
            }
        };
        Ok(removed as u64)
    }

    async fn count_step(&self, step: CascadeStep, group_id: Uuid) -> DbResult<u64> {
        let count = match step {
            CascadeStep::AccessCodes => self.access_code_ids(group_id).len(),
            CascadeStep::Memberships => self.membership_ids(group_id).len(),
            CascadeStep::Group => usize::from(self.groups.contains_key(&group_id)),
            _ => self.content_ids(step, group_id).len(),
        };
        Ok(count as u64)
    }
}
