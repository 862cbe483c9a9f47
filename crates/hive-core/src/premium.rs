//! Premium access resolution
//!
//! An account has premium access when its own plan is a paid tier with an
//! active status, or when the creator of a group it belongs to satisfies
//! that same direct condition. Inheritance is one hop: a member's access
//! never passes further to anyone else.

use hive_db::{AccountRow, DbResult, Repositories};
use hive_types::SubscriptionStatus;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Whether the account's own subscription grants premium access
pub fn has_direct_premium(account: &AccountRow) -> bool {
    account.tier().is_paid() && account.status() == Some(SubscriptionStatus::Active)
}

/// Resolves premium access, failing closed
#[derive(Clone, Debug)]
pub struct PremiumAccessResolver {
    repos: Repositories,
}

impl PremiumAccessResolver {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Whether the account currently has premium access.
    ///
    /// Lookup failures are logged and answered with `false`.
    #[instrument(skip(self))]
    pub async fn has_premium_access(&self, account_id: Uuid) -> bool {
        match self.resolve(account_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(account_id = %account_id, error = %e, "Premium check failed, denying access");
                metrics::counter!("hive_premium_check_errors_total").increment(1);
                false
            }
        }
    }

    async fn resolve(&self, account_id: Uuid) -> DbResult<bool> {
        let Some(account) = self.repos.accounts.find_by_id(account_id).await? else {
            debug!("Unknown account");
            return Ok(false);
        };

        if has_direct_premium(&account) {
            return Ok(true);
        }

        let creators = self
            .repos
            .memberships
            .find_group_creators_for_user(account_id)
            .await?;

        for creator_id in creators {
            if creator_id == account_id {
                continue;
            }
            let inherited = self
                .repos
                .accounts
                .find_by_id(creator_id)
                .await?
                .is_some_and(|creator| has_direct_premium(&creator));
            if inherited {
                debug!(creator_id = %creator_id, "Premium inherited from group creator");
                return Ok(true);
            }
        }

        Ok(false)
    }
}
