//! Notification audiences
//!
//! Who should receive a given notification type: accounts that opted in
//! and currently have premium access. Briefings are further narrowed to
//! the accounts whose preferred delivery hour matches.

use hive_db::{AccountRow, Repositories};
use hive_types::NotificationType;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::premium::PremiumAccessResolver;

pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_MORNING_BRIEFING: &str = "08:00";
pub const DEFAULT_EVENING_WRAPUP: &str = "18:00";

/// One notification recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub timezone: String,
    /// Preferred delivery time, set for briefing audiences only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
}

impl Recipient {
    fn from_account(account: &AccountRow, delivery_time: Option<String>) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            timezone: account
                .timezone
                .clone()
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            delivery_time,
        }
    }
}

/// Preferred "HH:MM" delivery time of a briefing, with defaults
fn briefing_time(account: &AccountRow, kind: NotificationType) -> Option<String> {
    match kind {
        NotificationType::MorningBriefing => Some(
            account
                .morning_briefing_time
                .clone()
                .unwrap_or_else(|| DEFAULT_MORNING_BRIEFING.to_string()),
        ),
        NotificationType::EveningWrapup => Some(
            account
                .evening_wrapup_time
                .clone()
                .unwrap_or_else(|| DEFAULT_EVENING_WRAPUP.to_string()),
        ),
        _ => None,
    }
}

/// Hour component of an "HH:MM" time
fn hour_of(time: &str) -> Option<u32> {
    time.split(':').next()?.trim().parse().ok()
}

/// Resolves notification audiences
#[derive(Clone, Debug)]
pub struct NotificationAudience {
    repos: Repositories,
    premium: PremiumAccessResolver,
}

impl NotificationAudience {
    pub fn new(repos: Repositories, premium: PremiumAccessResolver) -> Self {
        Self { repos, premium }
    }

    async fn eligible(&self, kind: NotificationType) -> Result<Vec<AccountRow>, LifecycleError> {
        let mut eligible = Vec::new();
        for account in self.repos.accounts.list_all().await? {
            if !account.preferences().is_enabled(kind) {
                continue;
            }
            if !self.premium.has_premium_access(account.id).await {
                debug!(account_id = %account.id, "No premium access, skipped");
                continue;
            }
            eligible.push(account);
        }
        Ok(eligible)
    }

    /// Accounts with `kind` enabled and premium access
    #[instrument(skip(self))]
    pub async fn accounts_for_notification(
        &self,
        kind: NotificationType,
    ) -> Result<Vec<Recipient>, LifecycleError> {
        Ok(self
            .eligible(kind)
            .await?
            .iter()
            .map(|a| Recipient::from_account(a, None))
            .collect())
    }

    /// Briefing recipients whose preferred hour is `hour`
    #[instrument(skip(self))]
    pub async fn accounts_for_briefing(
        &self,
        kind: NotificationType,
        hour: u32,
    ) -> Result<Vec<Recipient>, LifecycleError> {
        if !matches!(
            kind,
            NotificationType::MorningBriefing | NotificationType::EveningWrapup
        ) {
            return Err(LifecycleError::InvalidRequest(format!(
                "{kind} is not a briefing"
            )));
        }

        Ok(self
            .eligible(kind)
            .await?
            .iter()
            .filter_map(|account| {
                let time = briefing_time(account, kind)?;
                (hour_of(&time) == Some(hour)).then(|| Recipient::from_account(account, Some(time)))
            })
            .collect())
    }
}
