//! Notification audiences

mod common;

use common::Fixture;
use hive_core::LifecycleError;
use hive_types::{NotificationType, Tier};

#[tokio::test]
async fn test_audience_requires_opt_in_and_premium() {
    let fx = Fixture::new();

    let mut opted_in = fx.paid("in@example.com", Tier::Individual);
    opted_in.notifications.notify_weekly_summary = true;
    fx.store.insert_account(opted_in.clone());

    fx.paid("out@example.com", Tier::Individual);

    let mut free = fx.free("free@example.com");
    free.notifications.notify_weekly_summary = true;
    fx.store.insert_account(free);

    let recipients = fx
        .services
        .audience
        .accounts_for_notification(NotificationType::WeeklySummary)
        .await
        .unwrap();

    assert_eq!(recipients.len(), 1);
    assert_eq!(recipients[0].id, opted_in.id);
    assert_eq!(recipients[0].timezone, "America/New_York");
}

#[tokio::test]
async fn test_briefing_filters_by_hour() {
    let fx = Fixture::new();

    let mut default_time = fx.paid("a@example.com", Tier::Individual);
    default_time.notifications.notify_morning_briefing = true;
    fx.store.insert_account(default_time.clone());

    let mut early = fx.paid("b@example.com", Tier::Family);
    early.notifications.notify_morning_briefing = true;
    early.morning_briefing_time = Some("06:30".to_string());
    fx.store.insert_account(early.clone());

    let audience = &fx.services.audience;
    let at_eight = audience
        .accounts_for_briefing(NotificationType::MorningBriefing, 8)
        .await
        .unwrap();
    let at_six = audience
        .accounts_for_briefing(NotificationType::MorningBriefing, 6)
        .await
        .unwrap();

    assert_eq!(at_eight.len(), 1);
    assert_eq!(at_eight[0].id, default_time.id);
    assert_eq!(at_eight[0].delivery_time.as_deref(), Some("08:00"));
    assert_eq!(at_six.len(), 1);
    assert_eq!(at_six[0].id, early.id);
}

#[tokio::test]
async fn test_briefing_rejects_other_kinds() {
    let fx = Fixture::new();
    let err = fx
        .services
        .audience
        .accounts_for_briefing(NotificationType::TaskFollowups, 8)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidRequest(_)));
}
