//! Group cascade deletion

mod common;

use std::sync::Arc;

use common::{FailingAccounts, Fixture};
use hive_db::{CascadeStep, ContentRepository, MembershipRepository, GROUP_CASCADE_PLAN};
use hive_types::Tier;

#[tokio::test]
async fn test_cascade_removes_every_reference() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let member = fx.free("m@example.com");
    let group = fx.group(&owner, &[&member]);
    fx.seed_content(group.id);

    let report = fx
        .services
        .cascade
        .delete_group_and_content(group.id)
        .await
        .unwrap();

    assert_eq!(report.deleted.len(), GROUP_CASCADE_PLAN.len());
    assert_eq!(report.rows_for(CascadeStep::CustomListItems), 2);
    assert_eq!(report.rows_for(CascadeStep::Memberships), 2);
    assert_eq!(report.rows_for(CascadeStep::Group), 1);

    for step in GROUP_CASCADE_PLAN {
        assert_eq!(
            fx.store.count_step(step, group.id).await.unwrap(),
            0,
            "{step} still references the group"
        );
    }
    assert_eq!(fx.store.count_by_group(group.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_second_cascade_is_noop() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let group = fx.group(&owner, &[]);

    let first = fx
        .services
        .cascade
        .delete_group_and_content(group.id)
        .await
        .unwrap();
    let second = fx
        .services
        .cascade
        .delete_group_and_content(group.id)
        .await
        .unwrap();

    assert!(!first.is_noop());
    assert!(second.is_noop());
    assert_eq!(second.members_reset, 0);
}

#[tokio::test]
async fn test_members_reset_to_personal_mode() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let member = fx.free("m@example.com");
    let group = fx.group(&owner, &[&member]);

    let report = fx
        .services
        .cascade
        .delete_group_and_content(group.id)
        .await
        .unwrap();

    assert_eq!(report.members_reset, 1);
    assert_eq!(report.members_failed, 0);
    assert_eq!(fx.reload(member.id).active_group_id, Some(member.id));
    // The creator leaves the deleted group too but gets no removal email
    assert_eq!(fx.reload(owner.id).active_group_id, Some(owner.id));
    assert!(fx.mailer.attempts_for("owner@example.com").is_empty());
}

#[tokio::test]
async fn test_one_failing_recipient_does_not_block_others() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let a = fx.free("a@example.com");
    let b = fx.free("b@example.com");
    let c = fx.free("c@example.com");
    let group = fx.group(&owner, &[&a, &b, &c]);
    fx.mailer.fail_for("b@example.com");

    let report = fx
        .services
        .cascade
        .delete_group_and_content(group.id)
        .await
        .unwrap();

    assert_eq!(report.members_reset, 3);
    assert_eq!(report.members_notified, 2);
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        assert_eq!(fx.mailer.attempts_for(email).len(), 1, "{email}");
    }
    assert!(!fx.store.group_exists(group.id));
}

#[tokio::test]
async fn test_member_reset_failure_does_not_abort_cascade() {
    let mut failing = None;
    let fx = Fixture::with_repos(|store, mut repos| {
        let accounts = FailingAccounts::new(store.clone());
        failing = Some(accounts.clone());
        repos.accounts = Arc::new(accounts);
        repos
    });
    let failing = failing.unwrap();

    let owner = fx.paid("owner@example.com", Tier::Family);
    let a = fx.free("a@example.com");
    let b = fx.free("b@example.com");
    let c = fx.free("c@example.com");
    let group = fx.group(&owner, &[&a, &b, &c]);
    fx.seed_content(group.id);
    failing.fail_updates_for(b.id);

    let report = fx
        .services
        .cascade
        .delete_group_and_content(group.id)
        .await
        .unwrap();

    assert_eq!(report.members_reset, 2);
    assert_eq!(report.members_failed, 1);
    assert_eq!(report.members_notified, 3);
    assert!(!fx.store.group_exists(group.id));
    assert_eq!(fx.store.count_by_group(group.id).await.unwrap(), 0);

    assert_eq!(fx.reload(a.id).active_group_id, Some(a.id));
    assert_eq!(fx.reload(c.id).active_group_id, Some(c.id));
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        assert_eq!(fx.mailer.attempts_for(email).len(), 1, "{email}");
    }
}

#[tokio::test]
async fn test_deferred_cascade_sends_nothing_until_asked() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let a = fx.free("a@example.com");
    let b = fx.free("b@example.com");
    let group = fx.group(&owner, &[&a, &b]);

    let mut reports = fx
        .services
        .cascade
        .delete_groups_created_by_deferring_notices(owner.id)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(!fx.store.group_exists(group.id));
    assert_eq!(reports[0].pending_notices.len(), 2);
    assert_eq!(fx.mailer.total_attempts(), 0);

    fx.services
        .cascade
        .send_pending_notices(&mut reports[0])
        .await;

    assert!(reports[0].pending_notices.is_empty());
    assert_eq!(reports[0].members_notified, 2);
    assert_eq!(fx.mailer.attempts_for("a@example.com").len(), 1);
    assert_eq!(fx.mailer.attempts_for("b@example.com").len(), 1);
}
