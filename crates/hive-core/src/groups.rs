//! Group membership operations

use chrono::{DateTime, Utc};
use hive_db::{
    AccessCodeRow, CreateAccessCode, CreateGroup, CreateMembership, GroupRow, Repositories,
    SubscriptionUpdate,
};
use hive_types::{SubscriptionStatus, Tier};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cascade::{CascadeReport, GroupCascadeDeletor};
use crate::config::LifecycleConfig;
use crate::error::{AccessCodeRejection, LifecycleError};
use crate::notify::Notifier;
use crate::templates;

const FAMILY_GROUP: &str = "family";
const TEAM_GROUP: &str = "team";

/// Result of a successful access code redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub group_id: Uuid,
    pub group_name: String,
    /// False when the account was already in the group and nothing changed
    pub joined: bool,
}

fn generate_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_uppercase()
}

/// Tier granted to a free account joining a group of `group_type`
fn membership_tier(group_type: &str) -> Tier {
    if group_type == TEAM_GROUP {
        Tier::TeamMember
    } else {
        Tier::FamilyMember
    }
}

/// Group creation, access codes and membership changes
#[derive(Clone, Debug)]
pub struct GroupService {
    repos: Repositories,
    cascade: GroupCascadeDeletor,
    notifier: Notifier,
    config: LifecycleConfig,
}

impl GroupService {
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

    async fn load_group(&self, group_id: Uuid) -> Result<GroupRow, LifecycleError> {
        self.repos
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or(LifecycleError::GroupNotFound)
    }

    async fn is_admin(&self, group: &GroupRow, account_id: Uuid) -> Result<bool, LifecycleError> {
        if group.created_by_id == account_id {
            return Ok(true);
        }
        let members = self.repos.memberships.find_by_group(group.id).await?;
        Ok(members
            .iter()
            .any(|m| m.user_id == account_id && m.is_admin))
    }

    async fn require_admin(&self, group: &GroupRow, account_id: Uuid) -> Result<(), LifecycleError> {
        if self.is_admin(group, account_id).await? {
            Ok(())
        } else {
            Err(LifecycleError::NotGroupAdmin)
        }
    }

    /// Create a family group owned by `owner_id`
    #[instrument(skip(self))]
    pub async fn create_group(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> Result<GroupRow, LifecycleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::InvalidRequest("group name is empty".to_string()));
        }

        let owner = self
            .repos
            .accounts
            .find_by_id(owner_id)
            .await?
            .ok_or(LifecycleError::AccountNotFound)?;

        let tier = owner.tier();
        if !tier.owns_groups() || owner.status() != Some(SubscriptionStatus::Active) {
            return Err(LifecycleError::InvalidTier(tier.to_string()));
        }

        let group = self
            .repos
            .groups
            .create(CreateGroup {
                id: Uuid::new_v4(),
                name: name.to_string(),
                created_by_id: owner_id,
                group_type: FAMILY_GROUP.to_string(),
                max_members: tier
                    .max_group_members()
                    .and_then(|n| i32::try_from(n).ok()),
            })
            .await?;

        self.repos.memberships.delete_for_user(owner_id).await?;
        self.repos
            .memberships
            .create(CreateMembership {
                id: Uuid::new_v4(),
                user_id: owner_id,
                group_id: group.id,
                creator_id: owner_id,
                is_admin: true,
            })
            .await?;
        self.repos
            .accounts
            .set_active_group(owner_id, Some(group.id))
            .await?;

        info!(group_id = %group.id, owner_id = %owner_id, "Group created");
        Ok(group)
    }

    /// Issue an access code for the group. `uses = None` means unlimited.
    #[instrument(skip(self))]
    pub async fn create_access_code(
        &self,
        admin_id: Uuid,
        group_id: Uuid,
        uses: Option<i32>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessCodeRow, LifecycleError> {
        if uses.is_some_and(|n| n <= 0) {
            return Err(LifecycleError::InvalidRequest(
                "uses must be positive".to_string(),
            ));
        }

        let group = self.load_group(group_id).await?;
        self.require_admin(&group, admin_id).await?;

        let code = self
            .repos
            .access_codes
            .create(CreateAccessCode {
                id: Uuid::new_v4(),
                code: generate_code(),
                group_id,
                created_by_id: admin_id,
                uses_remaining: uses,
                expires_at,
            })
            .await?;

        info!(group_id = %group_id, code_id = %code.id, "Access code created");
        Ok(code)
    }

    /// Join the group an access code points to, replacing any prior membership
    #[instrument(skip(self, code))]
    pub async fn redeem_access_code(
        &self,
        account_id: Uuid,
        code: &str,
    ) -> Result<Redemption, LifecycleError> {
        let now = Utc::now();
        let account = self
            .repos
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(LifecycleError::AccountNotFound)?;

        let code = self
            .repos
            .access_codes
            .find_by_code(code.trim())
            .await?
            .ok_or(AccessCodeRejection::CodeNotFound)?;

        if code.is_expired(now) {
            return Err(AccessCodeRejection::CodeExpired.into());
        }
        if code.is_exhausted() {
            return Err(AccessCodeRejection::CodeExhausted.into());
        }

        let group = self
            .repos
            .groups
            .find_by_id(code.group_id)
            .await?
            .ok_or(AccessCodeRejection::CodeNotFound)?;

        let members = self.repos.memberships.find_by_group(group.id).await?;
        if members.iter().any(|m| m.user_id == account_id) {
            return Ok(Redemption {
                group_id: group.id,
                group_name: group.name,
                joined: false,
            });
        }
        // Joining would drop the owner's creator membership and orphan their group
        if !self.repos.groups.find_by_creator(account_id).await?.is_empty() {
            return Err(AccessCodeRejection::GroupOwner.into());
        }
        if let Some(max) = group.max_members {
            if members.len() >= usize::try_from(max).unwrap_or(0) {
                return Err(AccessCodeRejection::GroupFull.into());
            }
        }

        if !self.repos.access_codes.consume_use(code.id, now).await? {
            // Lost a race with another redemption or the expiry
            let rejection = if code.expires_at.is_some_and(|at| at <= Utc::now()) {
                AccessCodeRejection::CodeExpired
            } else {
                AccessCodeRejection::CodeExhausted
            };
            return Err(rejection.into());
        }

        self.repos.memberships.delete_for_user(account_id).await?;
        self.repos
            .memberships
            .create(CreateMembership {
                id: Uuid::new_v4(),
                user_id: account_id,
                group_id: group.id,
                creator_id: group.created_by_id,
                is_admin: false,
            })
            .await?;
        self.repos
            .accounts
            .set_active_group(account_id, Some(group.id))
            .await?;

        if account.tier() == Tier::Free {
            self.repos
                .accounts
                .update_subscription(
                    account_id,
                    SubscriptionUpdate {
                        tier: Some(membership_tier(&group.group_type).as_str().to_string()),
                        ..SubscriptionUpdate::default()
                    },
                )
                .await?;
        }

        info!(group_id = %group.id, account_id = %account_id, "Joined group with access code");
        metrics::counter!("hive_access_codes_redeemed_total").increment(1);

        for admin in members.iter().filter(|m| m.is_admin) {
            let admin_account = match self.repos.accounts.find_by_id(admin.user_id).await {
                Ok(Some(a)) => a,
                Ok(None) => continue,
                Err(e) => {
                    warn!(admin_id = %admin.user_id, error = %e, "Could not load group admin");
                    continue;
                }
            };
            let message = templates::member_joined(
                &self.config,
                &admin_account.email,
                &admin_account.name,
                &account.name,
                &account.email,
                &group.name,
            );
            self.notifier.send_best_effort("member_joined", message).await;
        }

        Ok(Redemption {
            group_id: group.id,
            group_name: group.name,
            joined: true,
        })
    }

    /// Remove a member from the group and return them to personal mode
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        admin_id: Uuid,
        group_id: Uuid,
        member_id: Uuid,
    ) -> Result<(), LifecycleError> {
        let group = self.load_group(group_id).await?;
        self.require_admin(&group, admin_id).await?;

        if member_id == group.created_by_id {
            return Err(LifecycleError::CannotRemoveCreator);
        }

        let removed = self
            .repos
            .memberships
            .delete_member(group_id, member_id)
            .await?;
        if removed == 0 {
            return Err(LifecycleError::NotGroupMember);
        }

        self.repos
            .accounts
            .set_active_group(member_id, Some(member_id))
            .await?;

        let Some(member) = self.repos.accounts.find_by_id(member_id).await? else {
            return Ok(());
        };
        if member.tier().is_membership_derived() {
            self.repos
                .accounts
                .update_subscription(
                    member_id,
                    SubscriptionUpdate {
                        tier: Some(Tier::Free.as_str().to_string()),
                        ..SubscriptionUpdate::default()
                    },
                )
                .await?;
        }

        info!(group_id = %group_id, member_id = %member_id, "Member removed");

        let message =
            templates::removed_from_group(&self.config, &member.email, &member.name, &group.name);
        self.notifier
            .send_best_effort("removed_from_group", message)
            .await;
        Ok(())
    }

    /// Delete a group. Only its creator may do this.
    #[instrument(skip(self))]
    pub async fn delete_group(
        &self,
        caller_id: Uuid,
        group_id: Uuid,
    ) -> Result<CascadeReport, LifecycleError> {
        let group = self.load_group(group_id).await?;
        if group.created_by_id != caller_id {
            return Err(LifecycleError::NotGroupAdmin);
        }
        self.cascade.delete_group_and_content(group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), 8);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_membership_tier_by_group_type() {
        assert_eq!(membership_tier("family"), Tier::FamilyMember);
        assert_eq!(membership_tier("team"), Tier::TeamMember);
    }
}
