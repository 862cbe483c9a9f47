//! Per-account subscription transitions

use chrono::{DateTime, Duration, Months, Utc};
use hive_db::{AccountRow, Repositories, SubscriptionUpdate};
use hive_types::{AccountId, SubscriptionDetails, SubscriptionStatus, Tier};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cascade::{CascadeReport, GroupCascadeDeletor};
use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::notify::Notifier;
use crate::templates;

/// One billing period after `from`
fn next_period_end(from: DateTime<Utc>) -> DateTime<Utc> {
    from.checked_add_months(Months::new(1))
        .unwrap_or(from + Duration::days(30))
}

/// Opaque billing reference with a type prefix
fn generate_reference(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &id[..16])
}

/// Subscription lifecycle operations for single accounts
#[derive(Clone, Debug)]
pub struct SubscriptionService {
    repos: Repositories,
    cascade: GroupCascadeDeletor,
    notifier: Notifier,
    config: LifecycleConfig,
}

impl SubscriptionService {
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

    async fn load(&self, account_id: Uuid) -> Result<AccountRow, LifecycleError> {
        self.repos
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(LifecycleError::AccountNotFound)
    }

    async fn load_subscribed(&self, account_id: Uuid) -> Result<AccountRow, LifecycleError> {
        match self.repos.accounts.find_by_id(account_id).await? {
            Some(account) if account.subscription_id.is_some() => Ok(account),
            _ => Err(LifecycleError::NoActiveSubscription),
        }
    }

    /// Start a paid plan after a successful checkout
    #[instrument(skip(self))]
    pub async fn activate_subscription(
        &self,
        account_id: Uuid,
        tier: Tier,
        subscription_id: Option<String>,
        customer_id: Option<String>,
    ) -> Result<(), LifecycleError> {
        if !tier.is_paid() {
            return Err(LifecycleError::InvalidTier(tier.to_string()));
        }
        self.load(account_id).await?;

        let now = Utc::now();
        self.repos
            .accounts
            .update_subscription(
                account_id,
                SubscriptionUpdate {
                    tier: Some(tier.as_str().to_string()),
                    status: Some(SubscriptionStatus::Active.as_str().to_string()),
                    current_period_end: Some(next_period_end(now)),
                    cancel_at_period_end: Some(false),
                    subscription_id: Some(
                        subscription_id.unwrap_or_else(|| generate_reference("sub")),
                    ),
                    customer_id: Some(customer_id.unwrap_or_else(|| generate_reference("cus"))),
                },
            )
            .await?;

        metrics::counter!("hive_subscriptions_activated_total", "tier" => tier.as_str())
            .increment(1);
        info!(account_id = %account_id, tier = %tier, "Subscription activated");
        Ok(())
    }

    /// Cancel an account's subscription.
    ///
    /// Deferred cancellation only sets the flag; the grace-period job
    /// downgrades later. Immediate cancellation closes owned groups and
    /// downgrades now. Billing references are kept either way.
    #[instrument(skip(self))]
    pub async fn cancel_subscription(
        &self,
        account_id: Uuid,
        immediate: bool,
    ) -> Result<Vec<CascadeReport>, LifecycleError> {
        let account = self.load_subscribed(account_id).await?;

        if !immediate {
            self.repos
                .accounts
                .update_subscription(
                    account_id,
                    SubscriptionUpdate {
                        cancel_at_period_end: Some(true),
                        ..SubscriptionUpdate::default()
                    },
                )
                .await?;
            info!(account_id = %account_id, "Subscription set to cancel at period end");
            return Ok(Vec::new());
        }

        let reports = if account.tier().owns_groups() {
            self.cascade.delete_groups_created_by(account_id).await?
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
                    current_period_end: Some(Utc::now()),
                    cancel_at_period_end: Some(false),
                    ..SubscriptionUpdate::default()
                },
            )
            .await?;

        metrics::counter!("hive_subscriptions_canceled_total").increment(1);
        info!(
            account_id = %account_id,
            groups_deleted = reports.len(),
            "Subscription canceled immediately"
        );
        Ok(reports)
    }

    /// Undo a pending cancellation
    #[instrument(skip(self))]
    pub async fn reactivate_subscription(&self, account_id: Uuid) -> Result<(), LifecycleError> {
        self.load_subscribed(account_id).await?;

        self.repos
            .accounts
            .update_subscription(
                account_id,
                SubscriptionUpdate {
                    status: Some(SubscriptionStatus::Active.as_str().to_string()),
                    cancel_at_period_end: Some(false),
                    ..SubscriptionUpdate::default()
                },
            )
            .await?;

        info!(account_id = %account_id, "Subscription reactivated");
        Ok(())
    }

    /// Record a successful renewal payment. Unknown references are ignored.
    #[instrument(skip(self))]
    pub async fn handle_subscription_renewed(
        &self,
        subscription_id: &str,
    ) -> Result<(), LifecycleError> {
        let Some(account) = self
            .repos
            .accounts
            .find_by_subscription_id(subscription_id)
            .await?
        else {
            debug!("No account for subscription, ignoring renewal");
            return Ok(());
        };

        self.repos
            .accounts
            .update_subscription(
                account.id,
                SubscriptionUpdate {
                    status: Some(SubscriptionStatus::Active.as_str().to_string()),
                    current_period_end: Some(next_period_end(Utc::now())),
                    cancel_at_period_end: Some(false),
                    ..SubscriptionUpdate::default()
                },
            )
            .await?;

        info!(account_id = %account.id, "Subscription renewed");
        Ok(())
    }

    /// Record a failed renewal payment. Unknown references are ignored.
    #[instrument(skip(self))]
    pub async fn handle_payment_failed(&self, subscription_id: &str) -> Result<(), LifecycleError> {
        let Some(account) = self
            .repos
            .accounts
            .find_by_subscription_id(subscription_id)
            .await?
        else {
            debug!("No account for subscription, ignoring payment failure");
            return Ok(());
        };

        self.repos
            .accounts
            .update_subscription(
                account.id,
                SubscriptionUpdate {
                    status: Some(SubscriptionStatus::PastDue.as_str().to_string()),
                    ..SubscriptionUpdate::default()
                },
            )
            .await?;

        info!(account_id = %account.id, "Subscription payment failed");

        let message = templates::payment_failed(&self.config, &account.email, &account.name);
        self.notifier
            .send_best_effort("payment_failed", message)
            .await;
        Ok(())
    }

    /// Subscription details, or `None` for accounts that never subscribed
    pub async fn subscription_details(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SubscriptionDetails>, LifecycleError> {
        let account = self.load(account_id).await?;
        let Some(subscription_id) = account.subscription_id.clone() else {
            return Ok(None);
        };

        Ok(Some(SubscriptionDetails {
            account_id: AccountId(account.id),
            subscription_id,
            customer_id: account.customer_id.clone().unwrap_or_default(),
            tier: account.tier(),
            status: account.status().unwrap_or(SubscriptionStatus::Active),
            current_period_end: account.current_period_end.unwrap_or_else(Utc::now),
            cancel_at_period_end: account.cancel_at_period_end,
        }))
    }

    /// Whether the account is in a current billing period.
    /// Unknown accounts have no subscription.
    pub async fn has_active_subscription(&self, account_id: Uuid) -> Result<bool, LifecycleError> {
        let Some(account) = self.repos.accounts.find_by_id(account_id).await? else {
            return Ok(false);
        };

        let current = account.status().is_some_and(|s| s.is_current());
        let not_expired = account
            .current_period_end
            .is_some_and(|end| end > Utc::now());
        Ok(current && not_expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_period_end_is_one_calendar_month() {
        let from = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(
            next_period_end(from),
            Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_generated_reference_shape() {
        let reference = generate_reference("sub");
        assert!(reference.starts_with("sub_"));
        assert_eq!(reference.len(), 20);
    }
}
