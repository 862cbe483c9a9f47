//! Seeded in-memory world for lifecycle tests

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use hive_core::{LifecycleConfig, LifecycleServices};
use hive_db::{
    AccessCodeRow, AccountRow, CascadeStep, GroupRow, MembershipRow, MemoryStore,
    NotificationRow, Repositories,
};
use hive_types::{SubscriptionStatus, Tier};
use uuid::Uuid;

use super::mailer::RecordingMailer;

pub struct Fixture {
    pub store: MemoryStore,
    pub mailer: RecordingMailer,
    pub services: LifecycleServices,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        Self::with_repos(|_, repos| repos)
    }

    /// Build services over repositories customized from the store's defaults
    pub fn with_repos(customize: impl FnOnce(&MemoryStore, Repositories) -> Repositories) -> Self {
        let config = LifecycleConfig::default().with_mail_timeout(StdDuration::from_secs(1));
        Self::build(config, customize)
    }

    /// Build services with production timeouts
    pub fn with_config(config: LifecycleConfig) -> Self {
        Self::build(config, |_, repos| repos)
    }

    fn build(
        config: LifecycleConfig,
        customize: impl FnOnce(&MemoryStore, Repositories) -> Repositories,
    ) -> Self {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let repos = customize(&store, store.repositories());
        let services = LifecycleServices::new(repos, Arc::new(mailer.clone()), config);

        Self {
            store,
            mailer,
            services,
        }
    }

    /// Insert an account with the given plan state
    pub fn account(
        &self,
        email: &str,
        tier: Tier,
        status: Option<SubscriptionStatus>,
        period_end: Option<DateTime<Utc>>,
    ) -> AccountRow {
        let now = Utc::now();
        let row = AccountRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            subscription_tier: tier.as_str().to_string(),
            subscription_status: status.map(|s| s.as_str().to_string()),
            current_period_end: period_end,
            cancel_at_period_end: false,
            active_group_id: None,
            subscription_id: tier.is_paid().then(|| format!("sub_{}", Uuid::new_v4().simple())),
            customer_id: tier.is_paid().then(|| format!("cus_{}", Uuid::new_v4().simple())),
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
        self.store.insert_account(row.clone());
        row
    }

    /// Active paid account in the middle of its billing period
    pub fn paid(&self, email: &str, tier: Tier) -> AccountRow {
        self.account(
            email,
            tier,
            Some(SubscriptionStatus::Active),
            Some(Utc::now() + Duration::days(20)),
        )
    }

    /// Free account with no subscription
    pub fn free(&self, email: &str) -> AccountRow {
        self.account(email, Tier::Free, None, None)
    }

    /// Paid account flagged to cancel, whose period ended `ago` before now
    pub fn lapsed(&self, email: &str, tier: Tier, ago: Duration) -> AccountRow {
        let mut row = self.account(
            email,
            tier,
            Some(SubscriptionStatus::Active),
            Some(Utc::now() - ago),
        );
        row.cancel_at_period_end = true;
        self.store.insert_account(row.clone());
        row
    }

    /// Group owned by `owner` with `members` joined; members view the group
    pub fn group(&self, owner: &AccountRow, members: &[&AccountRow]) -> GroupRow {
        let group = GroupRow {
            id: Uuid::new_v4(),
            name: format!("{} group", owner.name),
            created_by_id: owner.id,
            group_type: "family".to_string(),
            max_members: Some(6),
            created_at: Utc::now(),
        };
        self.store.insert_group(group.clone());
        self.join(&group, owner, true);
        for member in members {
            self.join(&group, member, false);
        }
        group
    }

    pub fn join(&self, group: &GroupRow, account: &AccountRow, is_admin: bool) {
        self.store.insert_membership(MembershipRow {
            id: Uuid::new_v4(),
            user_id: account.id,
            group_id: group.id,
            creator_id: group.created_by_id,
            is_admin,
            joined_at: Utc::now(),
        });
        let mut row = self.reload(account.id);
        row.active_group_id = Some(group.id);
        self.store.insert_account(row);
    }

    /// One row in every content table of the group
    pub fn seed_content(&self, group_id: Uuid) {
        let list = self.store.insert_content(CascadeStep::CustomLists, group_id);
        self.store.insert_content(CascadeStep::CustomListItems, list);
        self.store.insert_content(CascadeStep::CustomListItems, list);
        for step in [
            CascadeStep::Events,
            CascadeStep::ShoppingEntries,
            CascadeStep::Tasks,
            CascadeStep::ActivityLog,
        ] {
            self.store.insert_content(step, group_id);
        }
        self.access_code(group_id, "SEEDED01", Some(3), None);
    }

    pub fn access_code(
        &self,
        group_id: Uuid,
        code: &str,
        uses: Option<i32>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AccessCodeRow {
        let row = AccessCodeRow {
            id: Uuid::new_v4(),
            code: code.to_string(),
            group_id,
            created_by_id: Uuid::new_v4(),
            uses_remaining: uses,
            expires_at,
            created_at: Utc::now(),
        };
        self.store.insert_access_code(row.clone());
        row
    }

    pub fn reload(&self, id: Uuid) -> AccountRow {
        self.store.account(id).expect("account exists")
    }
}
