//! Group creation, access codes and member removal

mod common;

use chrono::{Duration, Utc};
use common::Fixture;
use hive_core::{AccessCodeRejection, LifecycleError};
use hive_db::MembershipRepository;
use hive_types::{SubscriptionStatus, Tier};

fn rejection(err: LifecycleError) -> AccessCodeRejection {
    match err {
        LifecycleError::AccessCode(r) => r,
        other => panic!("expected access code rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_group_requires_active_family_plan() {
    let fx = Fixture::new();
    let individual = fx.paid("i@example.com", Tier::Individual);
    let lapsed = fx.account(
        "l@example.com",
        Tier::Family,
        Some(SubscriptionStatus::PastDue),
        None,
    );
    let owner = fx.paid("owner@example.com", Tier::Family);
    let groups = &fx.services.groups;

    assert!(matches!(
        groups.create_group(individual.id, "Home").await,
        Err(LifecycleError::InvalidTier(_))
    ));
    assert!(matches!(
        groups.create_group(lapsed.id, "Home").await,
        Err(LifecycleError::InvalidTier(_))
    ));

    let group = groups.create_group(owner.id, "Home").await.unwrap();
    assert_eq!(group.max_members, Some(6));
    assert_eq!(fx.reload(owner.id).active_group_id, Some(group.id));

    let members = fx.store.find_by_group(group.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert!(members[0].is_admin);
}

#[tokio::test]
async fn test_only_admins_issue_codes() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let member = fx.free("m@example.com");
    let group = fx.group(&owner, &[&member]);
    let groups = &fx.services.groups;

    assert!(matches!(
        groups.create_access_code(member.id, group.id, Some(1), None).await,
        Err(LifecycleError::NotGroupAdmin)
    ));
    assert!(matches!(
        groups.create_access_code(owner.id, group.id, Some(0), None).await,
        Err(LifecycleError::InvalidRequest(_))
    ));

    let code = groups
        .create_access_code(owner.id, group.id, Some(2), None)
        .await
        .unwrap();
    assert_eq!(code.code.len(), 8);
    assert_eq!(code.uses_remaining, Some(2));
}

#[tokio::test]
async fn test_redeem_rejections() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let group = fx.group(&owner, &[]);
    let joiner = fx.free("j@example.com");
    fx.access_code(group.id, "EXPIRED1", None, Some(Utc::now() - Duration::hours(1)));
    fx.access_code(group.id, "USEDUP01", Some(0), None);
    let groups = &fx.services.groups;

    assert_eq!(
        rejection(groups.redeem_access_code(joiner.id, "NOPE").await.unwrap_err()),
        AccessCodeRejection::CodeNotFound
    );
    assert_eq!(
        rejection(groups.redeem_access_code(joiner.id, "EXPIRED1").await.unwrap_err()),
        AccessCodeRejection::CodeExpired
    );
    assert_eq!(
        rejection(groups.redeem_access_code(joiner.id, "USEDUP01").await.unwrap_err()),
        AccessCodeRejection::CodeExhausted
    );
}

#[tokio::test]
async fn test_redeem_full_group() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let members: Vec<_> = (0..5)
        .map(|i| fx.free(&format!("m{i}@example.com")))
        .collect();
    let refs: Vec<_> = members.iter().collect();
    let group = fx.group(&owner, &refs);
    let code = fx.access_code(group.id, "FULL0001", None, None);
    let joiner = fx.free("late@example.com");

    let err = fx
        .services
        .groups
        .redeem_access_code(joiner.id, &code.code)
        .await
        .unwrap_err();
    assert_eq!(rejection(err), AccessCodeRejection::GroupFull);
}

#[tokio::test]
async fn test_group_owner_cannot_redeem_another_code() {
    let fx = Fixture::new();
    let host = fx.paid("host@example.com", Tier::Family);
    let group = fx.group(&host, &[]);
    let code = fx.access_code(group.id, "OWNER001", Some(2), None);

    let owner = fx.paid("owner@example.com", Tier::Family);
    let own_group = fx.group(&owner, &[]);

    let err = fx
        .services
        .groups
        .redeem_access_code(owner.id, &code.code)
        .await
        .unwrap_err();
    assert_eq!(rejection(err), AccessCodeRejection::GroupOwner);

    // Creator membership and code uses untouched
    let memberships = fx.store.find_by_user(owner.id).await.unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].group_id, own_group.id);
    assert_eq!(fx.reload(owner.id).active_group_id, Some(own_group.id));
    assert_eq!(fx.store.access_code(code.id).unwrap().uses_remaining, Some(2));
    assert!(fx.mailer.attempts_for("host@example.com").is_empty());
}

#[tokio::test]
async fn test_redeem_joins_and_consumes_use() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let group = fx.group(&owner, &[]);
    let code = fx.access_code(group.id, "JOINME01", Some(1), None);

    let other_owner = fx.paid("other@example.com", Tier::Family);
    let joiner = fx.free("j@example.com");
    let old_group = fx.group(&other_owner, &[&joiner]);

    let redemption = fx
        .services
        .groups
        .redeem_access_code(joiner.id, "JOINME01")
        .await
        .unwrap();

    assert!(redemption.joined);
    assert_eq!(redemption.group_id, group.id);

    let joiner_after = fx.reload(joiner.id);
    assert_eq!(joiner_after.active_group_id, Some(group.id));
    assert_eq!(joiner_after.tier(), Tier::FamilyMember);

    let memberships = fx.store.find_by_user(joiner.id).await.unwrap();
    assert_eq!(memberships.len(), 1, "prior membership replaced");
    assert_eq!(memberships[0].group_id, group.id);
    assert!(fx
        .store
        .find_by_group(old_group.id)
        .await
        .unwrap()
        .iter()
        .all(|m| m.user_id != joiner.id));

    assert_eq!(fx.store.access_code(code.id).unwrap().uses_remaining, Some(0));
    let admin_mail = fx.mailer.attempts_for("owner@example.com");
    assert_eq!(admin_mail.len(), 1);
    assert!(admin_mail[0].subject.starts_with("New member joined"));

    let again = fx.free("k@example.com");
    let err = fx
        .services
        .groups
        .redeem_access_code(again.id, "JOINME01")
        .await
        .unwrap_err();
    assert_eq!(rejection(err), AccessCodeRejection::CodeExhausted);
}

#[tokio::test]
async fn test_paid_joiner_keeps_tier() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let group = fx.group(&owner, &[]);
    fx.access_code(group.id, "PAIDJOIN", None, None);
    let joiner = fx.paid("p@example.com", Tier::Individual);

    fx.services
        .groups
        .redeem_access_code(joiner.id, "PAIDJOIN")
        .await
        .unwrap();

    assert_eq!(fx.reload(joiner.id).tier(), Tier::Individual);
}

#[tokio::test]
async fn test_remove_member() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let member = fx.account("m@example.com", Tier::FamilyMember, None, None);
    let outsider = fx.free("o@example.com");
    let group = fx.group(&owner, &[&member]);
    let groups = &fx.services.groups;

    assert!(matches!(
        groups.remove_member(member.id, group.id, owner.id).await,
        Err(LifecycleError::NotGroupAdmin)
    ));
    assert!(matches!(
        groups.remove_member(owner.id, group.id, owner.id).await,
        Err(LifecycleError::CannotRemoveCreator)
    ));
    assert!(matches!(
        groups.remove_member(owner.id, group.id, outsider.id).await,
        Err(LifecycleError::NotGroupMember)
    ));

    groups
        .remove_member(owner.id, group.id, member.id)
        .await
        .unwrap();

    let member_after = fx.reload(member.id);
    assert_eq!(member_after.active_group_id, Some(member.id));
    assert_eq!(member_after.tier(), Tier::Free);
    assert_eq!(fx.mailer.attempts_for("m@example.com").len(), 1);
}

#[tokio::test]
async fn test_only_creator_deletes_group() {
    let fx = Fixture::new();
    let owner = fx.paid("owner@example.com", Tier::Family);
    let member = fx.free("m@example.com");
    let group = fx.group(&owner, &[&member]);

    assert!(matches!(
        fx.services.groups.delete_group(member.id, group.id).await,
        Err(LifecycleError::NotGroupAdmin)
    ));

    let report = fx
        .services
        .groups
        .delete_group(owner.id, group.id)
        .await
        .unwrap();
    assert_eq!(report.members_reset, 1);
    assert!(!fx.store.group_exists(group.id));
}
