//! Notification preference types

use serde::{Deserialize, Serialize};

/// Kinds of notification email an account can opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    MorningBriefing,
    EveningWrapup,
    EventReminders,
    ShoppingReminders,
    TaskFollowups,
    GroupActivity,
    WeeklySummary,
    SubscriptionUpdates,
}

impl NotificationType {
    /// All notification types
    pub const ALL: [Self; 8] = [
        Self::MorningBriefing,
        Self::EveningWrapup,
        Self::EventReminders,
        Self::ShoppingReminders,
        Self::TaskFollowups,
        Self::GroupActivity,
        Self::WeeklySummary,
        Self::SubscriptionUpdates,
    ];

    /// Get the notification type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MorningBriefing => "morning_briefing",
            Self::EveningWrapup => "evening_wrapup",
            Self::EventReminders => "event_reminders",
            Self::ShoppingReminders => "shopping_reminders",
            Self::TaskFollowups => "task_followups",
            Self::GroupActivity => "group_activity",
            Self::WeeklySummary => "weekly_summary",
            Self::SubscriptionUpdates => "subscription_updates",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = NotificationTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| NotificationTypeParseError(s.to_string()))
    }
}

/// Error parsing a notification type string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid notification type: {0}")]
pub struct NotificationTypeParseError(pub String);

/// Per-account notification opt-ins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub morning_briefing: bool,
    pub evening_wrapup: bool,
    pub event_reminders: bool,
    pub shopping_reminders: bool,
    pub task_followups: bool,
    pub group_activity: bool,
    pub weekly_summary: bool,
    pub subscription_updates: bool,
}

impl NotificationPreferences {
    /// Whether the given notification type is enabled
    pub const fn is_enabled(&self, kind: NotificationType) -> bool {
        match kind {
            NotificationType::MorningBriefing => self.morning_briefing,
            NotificationType::EveningWrapup => self.evening_wrapup,
            NotificationType::EventReminders => self.event_reminders,
            NotificationType::ShoppingReminders => self.shopping_reminders,
            NotificationType::TaskFollowups => self.task_followups,
            NotificationType::GroupActivity => self.group_activity,
            NotificationType::WeeklySummary => self.weekly_summary,
            NotificationType::SubscriptionUpdates => self.subscription_updates,
        }
    }

    /// Enable or disable a notification type
    pub fn set(&mut self, kind: NotificationType, enabled: bool) {
        let slot = match kind {
            NotificationType::MorningBriefing => &mut self.morning_briefing,
            NotificationType::EveningWrapup => &mut self.evening_wrapup,
            NotificationType::EventReminders => &mut self.event_reminders,
            NotificationType::ShoppingReminders => &mut self.shopping_reminders,
            NotificationType::TaskFollowups => &mut self.task_followups,
            NotificationType::GroupActivity => &mut self.group_activity,
            NotificationType::WeeklySummary => &mut self.weekly_summary,
            NotificationType::SubscriptionUpdates => &mut self.subscription_updates,
        };
        *slot = enabled;
    }
}
