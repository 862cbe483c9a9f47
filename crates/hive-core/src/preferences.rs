//! Per-account notification preferences

use std::collections::HashMap;

use hive_db::{AccountRow, PreferencesUpdate, Repositories};
use hive_types::{NotificationPreferences, NotificationType};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::audience::{DEFAULT_EVENING_WRAPUP, DEFAULT_MORNING_BRIEFING, DEFAULT_TIMEZONE};
use crate::error::LifecycleError;

/// Stored preferences with defaults applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub timezone: String,
    pub morning_briefing_time: String,
    pub evening_wrapup_time: String,
    pub notifications: NotificationPreferences,
}

impl Preferences {
    fn from_account(account: &AccountRow) -> Self {
        let or_default = |value: &Option<String>, default: &str| {
            value.clone().unwrap_or_else(|| default.to_string())
        };

        Self {
            timezone: or_default(&account.timezone, DEFAULT_TIMEZONE),
            morning_briefing_time: or_default(
                &account.morning_briefing_time,
                DEFAULT_MORNING_BRIEFING,
            ),
            evening_wrapup_time: or_default(&account.evening_wrapup_time, DEFAULT_EVENING_WRAPUP),
            notifications: account.preferences(),
        }
    }
}

/// Requested preference changes. Absent fields and notification types
/// keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesChange {
    pub timezone: Option<String>,
    pub morning_briefing_time: Option<String>,
    pub evening_wrapup_time: Option<String>,
    #[serde(default)]
    pub notifications: HashMap<NotificationType, bool>,
}

/// Whether `time` is a 24-hour "HH:MM"
fn is_clock_time(time: &str) -> bool {
    let Some((hour, minute)) = time.split_once(':') else {
        return false;
    };
    hour.len() == 2
        && minute.len() == 2
        && hour.parse::<u32>().is_ok_and(|h| h < 24)
        && minute.parse::<u32>().is_ok_and(|m| m < 60)
}

/// IANA-style zone name such as "America/New_York"
fn is_zone_name(zone: &str) -> bool {
    !zone.is_empty()
        && zone.len() <= 64
        && zone
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'))
}

impl PreferencesChange {
    fn validate(&self) -> Result<(), LifecycleError> {
        if let Some(zone) = &self.timezone {
            if !is_zone_name(zone) {
                return Err(LifecycleError::InvalidRequest(format!(
                    "invalid timezone: {zone}"
                )));
            }
        }
        for (field, time) in [
            ("morning_briefing_time", &self.morning_briefing_time),
            ("evening_wrapup_time", &self.evening_wrapup_time),
        ] {
            if let Some(time) = time {
                if !is_clock_time(time) {
                    return Err(LifecycleError::InvalidRequest(format!(
                        "{field} must be HH:MM"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Reads and updates notification preferences
#[derive(Clone, Debug)]
pub struct PreferenceService {
    repos: Repositories,
}

impl PreferenceService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn load(&self, account_id: Uuid) -> Result<AccountRow, LifecycleError> {
        self.repos
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(LifecycleError::AccountNotFound)
    }

    /// Current preferences of an account
    pub async fn get_preferences(&self, account_id: Uuid) -> Result<Preferences, LifecycleError> {
        Ok(Preferences::from_account(&self.load(account_id).await?))
    }

    /// Apply a change and return the resulting preferences
    #[instrument(skip(self, change))]
    pub async fn update_preferences(
        &self,
        account_id: Uuid,
        change: PreferencesChange,
    ) -> Result<Preferences, LifecycleError> {
        change.validate()?;
        let account = self.load(account_id).await?;

        let mut notifications = account.preferences();
        for (&kind, &enabled) in &change.notifications {
            notifications.set(kind, enabled);
        }

        self.repos
            .accounts
            .update_preferences(
                account_id,
                PreferencesUpdate {
                    timezone: change.timezone,
                    morning_briefing_time: change.morning_briefing_time,
                    evening_wrapup_time: change.evening_wrapup_time,
                    notifications: notifications.into(),
                },
            )
            .await?;

        info!(account_id = %account_id, "Preferences updated");
        self.get_preferences(account_id).await
    }
}
