//! Lifecycle email templates

use chrono::{DateTime, Utc};
use hive_types::Tier;

use crate::config::LifecycleConfig;
use crate::mailer::EmailMessage;

const SIGNATURE: &str = "Best regards,\nThe HiveOS Team";

fn wrap_html(heading: &str, paragraphs: &[String], link: (&str, &str)) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
    let (label, href) = link;
    format!(
        "<!DOCTYPE html><html><body style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">\
         <h2>{heading}</h2>{body}<p><a href=\"{href}\">{label}</a></p>\
         <p style=\"color: #666;\">Best regards,<br>The HiveOS Team</p></body></html>"
    )
}

/// Sent after a canceled plan is downgraded at the end of the grace period
pub fn downgrade_notice(
    config: &LifecycleConfig,
    to: &str,
    name: &str,
    previous_tier: Tier,
) -> EmailMessage {
    let url = config.subscription_url();
    let mut lines = vec![format!(
        "Your {previous_tier} plan has ended and your account is now on the free tier."
    )];
    if previous_tier.owns_groups() {
        lines.push(
            "Groups you created have been closed and their shared lists, events and tasks removed."
                .to_string(),
        );
    }
    lines.push("You can resubscribe at any time to restore premium features.".to_string());

    EmailMessage {
        to: to.to_string(),
        subject: "Your HiveOS subscription has ended".to_string(),
        text: format!(
            "Hi {name},\n\n{}\n\nManage your subscription: {url}\n\n{SIGNATURE}",
            lines.join("\n\n")
        ),
        html: Some(wrap_html(
            "Your subscription has ended",
            &lines,
            ("Manage subscription", &url),
        )),
    }
}

/// Sent to a member whose group was closed or who was removed from it
pub fn removed_from_group(
    config: &LifecycleConfig,
    to: &str,
    name: &str,
    group_name: &str,
) -> EmailMessage {
    let url = config.subscription_url();
    let lines = vec![
        format!("You are no longer a member of \"{group_name}\"."),
        "Your account has been switched back to your personal space.".to_string(),
    ];

    EmailMessage {
        to: to.to_string(),
        subject: format!("You have been removed from {group_name}"),
        text: format!(
            "Hi {name},\n\n{}\n\nSee your plan options: {url}\n\n{SIGNATURE}",
            lines.join("\n\n")
        ),
        html: Some(wrap_html(
            &format!("You have left {group_name}"),
            &lines,
            ("See plan options", &url),
        )),
    }
}

/// Sent to group admins when someone joins with an access code
pub fn member_joined(
    config: &LifecycleConfig,
    to: &str,
    admin_name: &str,
    member_name: &str,
    member_email: &str,
    group_name: &str,
) -> EmailMessage {
    let url = config.groups_url();
    let lines = vec![format!(
        "{member_name} ({member_email}) has joined your group \"{group_name}\" using an access code."
    )];

    EmailMessage {
        to: to.to_string(),
        subject: format!("New member joined {group_name}"),
        text: format!(
            "Hi {admin_name},\n\n{}\n\nYou can view and manage your group members at: {url}\n\n{SIGNATURE}",
            lines.join("\n\n")
        ),
        html: Some(wrap_html(
            &format!("New member joined {group_name}"),
            &lines,
            ("View group members", &url),
        )),
    }
}

/// Sent ahead of a canceled plan's period end
pub fn subscription_expiring(
    config: &LifecycleConfig,
    to: &str,
    name: &str,
    tier: Tier,
    period_end: DateTime<Utc>,
) -> EmailMessage {
    let url = config.subscription_url();
    let date = period_end.format("%B %-d, %Y");
    let lines = vec![
        format!("Your {tier} plan is set to end on {date}."),
        "Reactivate before then to keep your premium features and shared groups.".to_string(),
    ];

    EmailMessage {
        to: to.to_string(),
        subject: format!("Your HiveOS plan ends on {date}"),
        text: format!(
            "Hi {name},\n\n{}\n\nReactivate: {url}\n\n{SIGNATURE}",
            lines.join("\n\n")
        ),
        html: Some(wrap_html(
            "Your plan is ending soon",
            &lines,
            ("Reactivate", &url),
        )),
    }
}

/// Sent when a renewal payment fails
pub fn payment_failed(config: &LifecycleConfig, to: &str, name: &str) -> EmailMessage {
    let url = config.subscription_url();
    let lines = vec![
        "We could not process the latest payment for your HiveOS subscription.".to_string(),
        "Please update your payment method to avoid losing access.".to_string(),
    ];

    EmailMessage {
        to: to.to_string(),
        subject: "Payment failed for your HiveOS subscription".to_string(),
        text: format!(
            "Hi {name},\n\n{}\n\nUpdate payment details: {url}\n\n{SIGNATURE}",
            lines.join("\n\n")
        ),
        html: Some(wrap_html(
            "Payment failed",
            &lines,
            ("Update payment method", &url),
        )),
    }
}
