//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use hive_types::{AccountId, GroupId, NotificationPreferences, SubscriptionStatus, Tier};
use sqlx::FromRow;
use uuid::Uuid;

/// Account row from the database
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub subscription_tier: String,
    pub subscription_status: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub active_group_id: Option<Uuid>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub timezone: Option<String>,
    pub morning_briefing_time: Option<String>,
    pub evening_wrapup_time: Option<String>,
    #[sqlx(flatten)]
    pub notifications: NotificationRow,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notification opt-in columns of the accounts table
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct NotificationRow {
    pub notify_morning_briefing: bool,
    pub notify_evening_wrapup: bool,
    pub notify_event_reminders: bool,
    pub notify_shopping_reminders: bool,
    pub notify_task_followups: bool,
    pub notify_group_activity: bool,
    pub notify_weekly_summary: bool,
    pub notify_subscription_updates: bool,
}

/// Group row from the database
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub created_by_id: Uuid,
    pub group_type: String,
    pub max_members: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Group membership row from the database
#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub creator_id: Uuid,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

/// Access code row from the database
#[derive(Debug, Clone, FromRow)]
pub struct AccessCodeRow {
    pub id: Uuid,
    pub code: String,
    pub group_id: Uuid,
    pub created_by_id: Uuid,
    pub uses_remaining: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccountRow {
    /// Convert to domain AccountId
    pub fn account_id(&self) -> AccountId {
        AccountId(self.id)
    }

    /// Parsed tier; unknown values read as free
    pub fn tier(&self) -> Tier {
        self.subscription_tier.parse().unwrap_or_default()
    }

    /// Parsed status; NULL and unknown values read as no status
    pub fn status(&self) -> Option<SubscriptionStatus> {
        self.subscription_status
            .as_deref()
            .and_then(|s| s.parse().ok())
    }

    /// Typed notification preferences
    pub fn preferences(&self) -> NotificationPreferences {
        self.notifications.into()
    }
}

impl From<NotificationRow> for NotificationPreferences {
    fn from(row: NotificationRow) -> Self {
        Self {
            morning_briefing: row.notify_morning_briefing,
            evening_wrapup: row.notify_evening_wrapup,
            event_reminders: row.notify_event_reminders,
            shopping_reminders: row.notify_shopping_reminders,
            task_followups: row.notify_task_followups,
            group_activity: row.notify_group_activity,
            weekly_summary: row.notify_weekly_summary,
            subscription_updates: row.notify_subscription_updates,
        }
    }
}

impl From<NotificationPreferences> for NotificationRow {
    fn from(prefs: NotificationPreferences) -> Self {
        Self {
            notify_morning_briefing: prefs.morning_briefing,
            notify_evening_wrapup: prefs.evening_wrapup,
            notify_event_reminders: prefs.event_reminders,
            notify_shopping_reminders: prefs.shopping_reminders,
            notify_task_followups: prefs.task_followups,
            notify_group_activity: prefs.group_activity,
            notify_weekly_summary: prefs.weekly_summary,
            notify_subscription_updates: prefs.subscription_updates,
        }
    }
}

impl GroupRow {
    /// Convert to domain GroupId
    pub fn group_id(&self) -> GroupId {
        GroupId(self.id)
    }
}

impl AccessCodeRow {
    /// Whether the code's expiry has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether a use-limited code has no uses left
    pub fn is_exhausted(&self) -> bool {
        self.uses_remaining.is_some_and(|n| n <= 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hive_types::NotificationType;

    fn account(tier: &str, status: Option<&str>) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            subscription_tier: tier.to_string(),
            subscription_status: status.map(str::to_string),
            current_period_end: None,
            cancel_at_period_end: false,
            active_group_id: None,
            subscription_id: None,
            customer_id: None,
            timezone: None,
            morning_briefing_time: None,
            evening_wrapup_time: None,
            notifications: NotificationRow::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unknown_tier_reads_as_free() {
        assert_eq!(account("platinum", None).tier(), Tier::Free);
        assert_eq!(account("family", None).tier(), Tier::Family);
    }

    #[test]
    fn test_null_status_reads_as_none() {
        assert_eq!(account("free", None).status(), None);
        assert_eq!(
            account("free", Some("past_due")).status(),
            Some(SubscriptionStatus::PastDue)
        );
    }

    #[test]
    fn test_notification_columns_map_to_preferences() {
        let mut row = account("free", None);
        row.notifications.notify_weekly_summary = true;
        let prefs = row.preferences();
        assert!(prefs.is_enabled(NotificationType::WeeklySummary));
        assert!(!prefs.is_enabled(NotificationType::MorningBriefing));
    }

    #[test]
    fn test_access_code_validity() {
        let now = Utc::now();
        let mut code = AccessCodeRow {
            id: Uuid::new_v4(),
            code: "ABCD1234".to_string(),
            group_id: Uuid::new_v4(),
            created_by_id: Uuid::new_v4(),
            uses_remaining: None,
            expires_at: None,
            created_at: now,
        };
        assert!(!code.is_expired(now));
        assert!(!code.is_exhausted());

        code.expires_at = Some(now - Duration::seconds(1));
        code.uses_remaining = Some(0);
        assert!(code.is_expired(now));
        assert!(code.is_exhausted());
    }
}
