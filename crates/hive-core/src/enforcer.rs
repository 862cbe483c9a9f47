//! Scheduled subscription jobs
//!
//! [`GracePeriodEnforcer::enforce_subscription_cancellations`] downgrades
//! accounts whose canceled plan ended more than the grace period ago.
//! [`GracePeriodEnforcer::warn_expiring_subscriptions`] reminds accounts
//! whose canceled plan is about to end.
//!
//! Both jobs process accounts one at a time and isolate failures per
//! account: one bad account is counted and logged, and the scan goes on.

use std::time::Instant;

use chrono::{DateTime, Utc};
use hive_db::{AccountRow, Repositories, SubscriptionUpdate};
use hive_types::{NotificationType, SubscriptionStatus, Tier};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cascade::{CascadeReport, GroupCascadeDeletor};
use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::notify::Notifier;
use crate::templates;

/// One downgraded account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DowngradeDetail {
    pub account_id: Uuid,
    pub email: String,
    pub previous_tier: Tier,
}

/// Work done inside the timed section for one candidate
struct Downgraded {
    detail: DowngradeDetail,
    name: String,
    cascades: Vec<CascadeReport>,
}

/// Result of an enforcement run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnforcementReport {
    pub downgraded: usize,
    pub failed: usize,
    pub details: Vec<DowngradeDetail>,
}

/// Result of an expiry warning run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarningReport {
    pub processed: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Whether an account is due for downgrade at `cutoff`
pub fn is_due_for_downgrade(account: &AccountRow, cutoff: DateTime<Utc>) -> bool {
    account.cancel_at_period_end
        && account.current_period_end.is_some_and(|end| end < cutoff)
        && account.tier() != Tier::Free
}

/// Grace-period enforcement and expiry warnings
#[derive(Clone, Debug)]
pub struct GracePeriodEnforcer {
    repos: Repositories,
    cascade: GroupCascadeDeletor,
    notifier: Notifier,
    config: LifecycleConfig,
}

impl GracePeriodEnforcer {
    pub fn new(
        repos: Repositories,
        cascade: GroupCascadeDeletor,
        notifier: Notifier,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            repos,
            cascade,
            notifier,
            config,
        }
    }

    /// Downgrade every account whose cancellation is past the grace period
    pub async fn enforce_subscription_cancellations(
        &self,
    ) -> Result<EnforcementReport, LifecycleError> {
        self.enforce_at(Utc::now()).await
    }

    /// Run enforcement as of `now`
    #[instrument(skip(self))]
    pub async fn enforce_at(&self, now: DateTime<Utc>) -> Result<EnforcementReport, LifecycleError> {
        let started = Instant::now();
        let cutoff = now - self.config.grace_period;
        let candidates = self.repos.accounts.find_due_for_downgrade(cutoff).await?;

        info!(count = candidates.len(), cutoff = %cutoff, "Enforcing subscription cancellations");

        let mut report = EnforcementReport::default();

        for candidate in candidates {
            let outcome = tokio::time::timeout(
                self.config.candidate_timeout,
                self.downgrade(candidate.id, cutoff),
            )
            .await
            .unwrap_or(Err(LifecycleError::Timeout));

            // Email goes out after the timed section so a slow relay
            // cannot fail a downgrade that already committed
            match outcome {
                Ok(Some(Downgraded {
                    detail,
                    name,
                    mut cascades,
                })) => {
                    for cascade in &mut cascades {
                        self.cascade.send_pending_notices(cascade).await;
                    }

                    let message = templates::downgrade_notice(
                        &self.config,
                        &detail.email,
                        &name,
                        detail.previous_tier,
                    );
                    self.notifier
                        .send_best_effort("downgrade_notice", message)
                        .await;

                    report.downgraded += 1;
                    report.details.push(detail);
                }
                Ok(None) => {
                    info!(account_id = %candidate.id, "Account no longer due, skipped");
                }
                Err(e) => {
                    error!(account_id = %candidate.id, error = %e, "Failed to downgrade account");
                    metrics::counter!("hive_enforcement_failures_total").increment(1);
                    report.failed += 1;
                }
            }
        }

        metrics::counter!("hive_accounts_downgraded_total").increment(report.downgraded as u64);
        metrics::histogram!("hive_enforcement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            downgraded = report.downgraded,
            failed = report.failed,
            "Subscription enforcement complete"
        );

        Ok(report)
    }

    /// Downgrade one candidate after re-checking it is still due. Returns
    /// `None` when the account changed since the scan (e.g. reactivated).
    /// Sends no email.
    async fn downgrade(
        &self,
        account_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Downgraded>, LifecycleError> {
        let Some(account) = self.repos.accounts.find_by_id(account_id).await? else {
            return Ok(None);
        };
        if !is_due_for_downgrade(&account, cutoff) {
            return Ok(None);
        }

        let previous_tier = account.tier();
        let cascades = if previous_tier.owns_groups() {
            self.cascade
                .delete_groups_created_by_deferring_notices(account_id)
                .await?
        } else {
            Vec::new()
        };

        self.repos
            .accounts
            .update_subscription(
                account_id,
                SubscriptionUpdate {
                    tier: Some(Tier::Free.as_str().to_string()),
                    status: Some(SubscriptionStatus::Canceled.as_str().to_string()),
                    cancel_at_period_end: Some(false),
                    ..SubscriptionUpdate::default()
                },
            )
            .await?;

        info!(account_id = %account_id, previous_tier = %previous_tier, "Account downgraded");

        Ok(Some(Downgraded {
            detail: DowngradeDetail {
                account_id,
                email: account.email,
                previous_tier,
            },
            name: account.name,
            cascades,
        }))
    }

    /// Warn accounts whose canceled plan ends in the slice ending one
    /// warning window from now
    pub async fn warn_expiring_subscriptions(&self) -> Result<WarningReport, LifecycleError> {
        self.warn_at(Utc::now()).await
    }

    /// Run the expiry warning job as of `now`
    #[instrument(skip(self))]
    pub async fn warn_at(&self, now: DateTime<Utc>) -> Result<WarningReport, LifecycleError> {
        let until = now + self.config.warning_window;
        let from = until - self.config.warning_slice;
        let accounts = self.repos.accounts.find_expiring_between(from, until).await?;

        let mut report = WarningReport::default();

        for account in accounts {
            let tier = account.tier();
            if !tier.is_paid() {
                continue;
            }
            report.processed += 1;

            if !account
                .preferences()
                .is_enabled(NotificationType::SubscriptionUpdates)
            {
                continue;
            }
            let Some(period_end) = account.current_period_end else {
                continue;
            };

            let message = templates::subscription_expiring(
                &self.config,
                &account.email,
                &account.name,
                tier,
                period_end,
            );
            if self
                .notifier
                .send_best_effort("subscription_expiring", message)
                .await
            {
                report.notified += 1;
            } else {
                warn!(account_id = %account.id, "Expiry warning not delivered");
                report.failed += 1;
            }
        }

        info!(
            processed = report.processed,
            notified = report.notified,
            failed = report.failed,
            "Expiry warnings complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hive_db::NotificationRow;

    fn account(tier: &str, cancel: bool, end: Option<DateTime<Utc>>) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            subscription_tier: tier.to_string(),
            subscription_status: Some("active".to_string()),
            current_period_end: end,
            cancel_at_period_end: cancel,
            active_group_id: None,
            subscription_id: Some("sub_1".to_string()),
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
    fn test_due_predicate() {
        let cutoff = Utc::now();
        let past = Some(cutoff - Duration::minutes(1));

        assert!(is_due_for_downgrade(&account("family", true, past), cutoff));
        assert!(!is_due_for_downgrade(&account("family", false, past), cutoff));
        assert!(!is_due_for_downgrade(&account("free", true, past), cutoff));
        assert!(!is_due_for_downgrade(&account("family", true, None), cutoff));
        assert!(!is_due_for_downgrade(
            &account("individual", true, Some(cutoff)),
            cutoff
        ));
    }
}
