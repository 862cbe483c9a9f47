//! Repository traits
//!
//! Define async repository interfaces for database operations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cascade::CascadeStep;
use crate::error::DbResult;
use crate::models::*;

/// Account repository trait
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AccountRow>>;

    /// Find an account by its billing subscription reference
    async fn find_by_subscription_id(&self, subscription_id: &str)
        -> DbResult<Option<AccountRow>>;

    /// List every account
    async fn list_all(&self) -> DbResult<Vec<AccountRow>>;

    /// Accounts flagged to cancel whose period ended before `cutoff` and
    /// that are still on a non-free tier
    async fn find_due_for_downgrade(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<AccountRow>>;

    /// Active accounts flagged to cancel whose period ends in `[from, until)`
    async fn find_expiring_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<AccountRow>>;

    /// Create a new account
    async fn create(&self, account: CreateAccount) -> DbResult<AccountRow>;

    /// Apply subscription field changes; `None` fields are left untouched.
    /// Returns `DbError::NotFound` if the account does not exist.
    async fn update_subscription(&self, id: Uuid, update: SubscriptionUpdate) -> DbResult<()>;

    /// Set which group's shared resources the account views
    async fn set_active_group(&self, id: Uuid, group_id: Option<Uuid>) -> DbResult<()>;

    /// Replace the notification opt-ins and apply the set schedule fields.
    /// Returns `DbError::NotFound` if the account does not exist.
    async fn update_preferences(&self, id: Uuid, update: PreferencesUpdate) -> DbResult<()>;
}

/// Create account input
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Subscription field changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub tier: Option<String>,
    pub status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
}

/// Notification preference changes; `None` schedule fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub timezone: Option<String>,
    pub morning_briefing_time: Option<String>,
    pub evening_wrapup_time: Option<String>,
    pub notifications: NotificationRow,
}

/// Group repository trait
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Find a group by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<GroupRow>>;

    /// Find all groups created by an account
    async fn find_by_creator(&self, creator_id: Uuid) -> DbResult<Vec<GroupRow>>;

    /// Create a new group
    async fn create(&self, group: CreateGroup) -> DbResult<GroupRow>;
}

/// Create group input
#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub id: Uuid,
    pub name: String,
    pub created_by_id: Uuid,
    pub group_type: String,
    pub max_members: Option<i32>,
}

/// Group membership repository trait
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Find all memberships of a group
    async fn find_by_group(&self, group_id: Uuid) -> DbResult<Vec<MembershipRow>>;

    /// Find all memberships held by an account
    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<MembershipRow>>;

    /// Creators of every group the account belongs to (joined through groups)
    async fn find_group_creators_for_user(&self, user_id: Uuid) -> DbResult<Vec<Uuid>>;

    /// Count members of a group
    async fn count_by_group(&self, group_id: Uuid) -> DbResult<i64>;

    /// Create a new membership
    async fn create(&self, membership: CreateMembership) -> DbResult<MembershipRow>;

    /// Delete every membership held by an account
    async fn delete_for_user(&self, user_id: Uuid) -> DbResult<u64>;

    /// Delete one account's membership of one group
    async fn delete_member(&self, group_id: Uuid, user_id: Uuid) -> DbResult<u64>;
}

/// Create membership input
#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub creator_id: Uuid,
    pub is_admin: bool,
}

/// Access code repository trait
#[async_trait]
pub trait AccessCodeRepository: Send + Sync {
    /// Find an access code by its token
    async fn find_by_code(&self, code: &str) -> DbResult<Option<AccessCodeRow>>;

    /// Create a new access code
    async fn create(&self, code: CreateAccessCode) -> DbResult<AccessCodeRow>;

    /// Consume one use of a code. Returns false if the code is expired or
    /// has no uses left; unlimited codes are never decremented.
    async fn consume_use(&self, id: Uuid, now: DateTime<Utc>) -> DbResult<bool>;
}

/// Create access code input
#[derive(Debug, Clone)]
pub struct CreateAccessCode {
    pub id: Uuid,
    pub code: String,
    pub group_id: Uuid,
    pub created_by_id: Uuid,
    pub uses_remaining: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Group-scoped bulk deletes used by the cascade
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Delete every row the step covers for the group
    async fn delete_step(&self, step: CascadeStep, group_id: Uuid) -> DbResult<u64>;

    /// Count rows the step covers for the group
    async fn count_step(&self, step: CascadeStep, group_id: Uuid) -> DbResult<u64>;
}

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub access_codes: Arc<dyn AccessCodeRepository>,
    pub content: Arc<dyn ContentRepository>,
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
