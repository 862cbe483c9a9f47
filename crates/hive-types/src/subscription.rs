//! Subscription types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Tier};

/// Subscription status as reported by the billing provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is active
    Active,
    /// Subscription was canceled
    Canceled,
    /// Payment is past due
    PastDue,
    /// In trial period
    Trialing,
    /// Checkout started but never completed
    Incomplete,
}

impl SubscriptionStatus {
    /// Stable string form used in storage
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::PastDue => "past_due",
            Self::Trialing => "trialing",
            Self::Incomplete => "incomplete",
        }
    }

    /// Whether the billing relationship is currently in good standing
    pub const fn is_current(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            "past_due" => Ok(Self::PastDue),
            "trialing" => Ok(Self::Trialing),
            "incomplete" => Ok(Self::Incomplete),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

/// Error parsing a subscription status string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid subscription status: {0}")]
pub struct StatusParseError(pub String);

/// Subscription details for an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionDetails {
    /// Account that owns the subscription
    pub account_id: AccountId,
    /// Billing provider subscription reference
    pub subscription_id: String,
    /// Billing provider customer reference
    pub customer_id: String,
    /// Current tier
    pub tier: Tier,
    /// Subscription status
    pub status: SubscriptionStatus,
    /// End of the current billing period
    pub current_period_end: DateTime<Utc>,
    /// Whether the subscription lapses at period end
    pub cancel_at_period_end: bool,
}

/// Public price list entry
#[derive(Debug, Clone, Serialize)]
pub struct PlanPricing {
    pub tier: Tier,
    pub name: &'static str,
    pub price_cents: u32,
    pub currency: &'static str,
    pub interval: &'static str,
    pub features: &'static [&'static str],
}

/// Price list for the paid plans
pub fn pricing() -> [PlanPricing; 2] {
    [
        PlanPricing {
            tier: Tier::Individual,
            name: "Individual",
            price_cents: Tier::Individual.price_cents(),
            currency: "USD",
            interval: "month",
            features: &[
                "Unlimited data storage",
                "Multiple device sync",
                "Create groups with other paid users",
                "Real-time collaboration",
                "Priority support",
            ],
        },
        PlanPricing {
            tier: Tier::Family,
            name: "Family Plan",
            price_cents: Tier::Family.price_cents(),
            currency: "USD",
            interval: "month",
            features: &[
                "Everything in Individual",
                "Up to 6 family members",
                "Generate access codes for family",
                "Family members get free access",
                "Manage all members",
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_accepts_british_spelling() {
        assert_eq!(
            "cancelled".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Canceled
        );
    }

    #[test]
    fn test_current_statuses() {
        assert!(SubscriptionStatus::Active.is_current());
        assert!(SubscriptionStatus::Trialing.is_current());
        assert!(!SubscriptionStatus::PastDue.is_current());
        assert!(!SubscriptionStatus::Canceled.is_current());
    }

    #[test]
    fn test_pricing_matches_tier_prices() {
        let plans = pricing();
        assert_eq!(plans[0].price_cents, 500);
        assert_eq!(plans[1].price_cents, 2_000);
    }
}
