//! Group cascade deletion

use hive_db::{CascadeStep, GroupRow, MembershipRow, Repositories, GROUP_CASCADE_PLAN};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::mailer::EmailMessage;
use crate::notify::Notifier;
use crate::templates;

/// Rows removed by one cascade step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: u64,
}

/// Outcome of deleting one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub group_id: Uuid,
    /// Per-step row counts, in plan order; empty when the group was already gone
    pub deleted: Vec<TableCount>,
    /// Non-creator members switched back to personal mode
    pub members_reset: usize,
    /// Members whose active group could not be reset
    pub members_failed: usize,
    /// Removal emails accepted by the transport
    pub members_notified: usize,
    /// Removal emails built but not yet sent
    #[serde(skip)]
    pub pending_notices: Vec<EmailMessage>,
}

impl CascadeReport {
    fn empty(group_id: Uuid) -> Self {
        Self {
            group_id,
            ..Self::default()
        }
    }

    /// Whether the call found nothing to delete
    pub fn is_noop(&self) -> bool {
        self.deleted.is_empty()
    }

    /// Rows removed for one step
    pub fn rows_for(&self, step: CascadeStep) -> u64 {
        self.deleted
            .iter()
            .find(|c| c.table == step.table())
            .map_or(0, |c| c.rows)
    }
}

/// Deletes a group and everything that references it
#[derive(Clone, Debug)]
pub struct GroupCascadeDeletor {
    repos: Repositories,
    notifier: Notifier,
    config: LifecycleConfig,
}

impl GroupCascadeDeletor {
    pub fn new(repos: Repositories, notifier: Notifier, config: LifecycleConfig) -> Self {
        Self {
            repos,
            notifier,
            config,
        }
    }

    /// Delete the group, its owned resources and memberships, then email
    /// the removed members.
    ///
    /// Irreversible. Calling it again for a deleted group returns an empty
    /// report.
    pub async fn delete_group_and_content(
        &self,
        group_id: Uuid,
    ) -> Result<CascadeReport, LifecycleError> {
        let mut report = self.delete_group_deferring_notices(group_id).await?;
        self.send_pending_notices(&mut report).await;
        Ok(report)
    }

    /// Delete every group the account created, then email removed members
    pub async fn delete_groups_created_by(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<CascadeReport>, LifecycleError> {
        let mut reports = self.delete_groups_created_by_deferring_notices(owner_id).await?;
        for report in &mut reports {
            self.send_pending_notices(report).await;
        }
        Ok(reports)
    }

    /// Delete every group the account created. Removal emails are left in
    /// each report's `pending_notices` for [`Self::send_pending_notices`].
    pub async fn delete_groups_created_by_deferring_notices(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<CascadeReport>, LifecycleError> {
        let groups = self.repos.groups.find_by_creator(owner_id).await?;
        let mut reports = Vec::with_capacity(groups.len());
        for group in groups {
            reports.push(self.delete_group_deferring_notices(group.id).await?);
        }
        Ok(reports)
    }

    /// Delete one group without sending email
    #[instrument(skip(self))]
    pub async fn delete_group_deferring_notices(
        &self,
        group_id: Uuid,
    ) -> Result<CascadeReport, LifecycleError> {
        let Some(group) = self.repos.groups.find_by_id(group_id).await? else {
            info!("Group already deleted");
            return Ok(CascadeReport::empty(group_id));
        };

        let members = self.repos.memberships.find_by_group(group_id).await?;
        let mut report = CascadeReport::empty(group_id);

        for step in GROUP_CASCADE_PLAN {
            if step.needs_members_reset_first() {
                self.reset_members(&group, &members, &mut report).await;
            }
            let rows = self.repos.content.delete_step(step, group_id).await?;
            report.deleted.push(TableCount {
                table: step.table(),
                rows,
            });
        }

        metrics::counter!("hive_groups_deleted_total").increment(1);
        info!(
            group_id = %group_id,
            members_reset = report.members_reset,
            members_failed = report.members_failed,
            "Group deleted"
        );

        Ok(report)
    }

    /// Send and drain the report's pending removal emails
    pub async fn send_pending_notices(&self, report: &mut CascadeReport) {
        for message in std::mem::take(&mut report.pending_notices) {
            if self
                .notifier
                .send_best_effort("removed_from_group", message)
                .await
            {
                report.members_notified += 1;
            }
        }
    }

    /// Point every member, the creator included, back at their own
    /// workspace and queue removal emails for the non-creators. A failed
    /// reset is counted and does not stop the others.
    async fn reset_members(
        &self,
        group: &GroupRow,
        members: &[MembershipRow],
        report: &mut CascadeReport,
    ) {
        if let Err(e) = self
            .repos
            .accounts
            .set_active_group(group.created_by_id, Some(group.created_by_id))
            .await
        {
            warn!(user_id = %group.created_by_id, error = %e, "Could not reset group creator");
            metrics::counter!("hive_member_reset_failures_total").increment(1);
            report.members_failed += 1;
        }

        for member in members.iter().filter(|m| m.user_id != group.created_by_id) {
            match self
                .repos
                .accounts
                .set_active_group(member.user_id, Some(member.user_id))
                .await
            {
                Ok(()) => report.members_reset += 1,
                Err(e) => {
                    warn!(user_id = %member.user_id, error = %e, "Could not reset group member");
                    metrics::counter!("hive_member_reset_failures_total").increment(1);
                    report.members_failed += 1;
                }
            }

            // The membership goes away either way
            if let Some(message) = self.removal_notice(member.user_id, &group.name).await {
                report.pending_notices.push(message);
            }
        }
    }

    async fn removal_notice(&self, user_id: Uuid, group_name: &str) -> Option<EmailMessage> {
        let account = match self.repos.accounts.find_by_id(user_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Could not load member for removal email");
                return None;
            }
        };

        Some(templates::removed_from_group(
            &self.config,
            &account.email,
            &account.name,
            group_name,
        ))
    }
}
