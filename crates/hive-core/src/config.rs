//! Lifecycle configuration

use std::time::Duration;

/// Subscription lifecycle configuration
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Delay after the billing period ends before a canceled plan is downgraded
    pub grace_period: chrono::Duration,
    /// How far ahead the expiry warning job looks
    pub warning_window: chrono::Duration,
    /// Width of the period-end slice one warning run covers (the job cadence)
    pub warning_slice: chrono::Duration,
    /// Upper bound on a single email send
    pub mail_timeout: Duration,
    /// Upper bound on processing one enforcement candidate
    pub candidate_timeout: Duration,
    /// Base URL used in email links
    pub app_url: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period: chrono::Duration::hours(48),
            warning_window: chrono::Duration::days(7),
            warning_slice: chrono::Duration::days(1),
            mail_timeout: Duration::from_secs(10),
            candidate_timeout: Duration::from_secs(30),
            app_url: "https://hiveos.app".to_string(),
        }
    }
}

impl LifecycleConfig {
    /// Create a config with default windows
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into(),
            ..Self::default()
        }
    }

    /// Set the grace period
    pub fn with_grace_period(mut self, grace_period: chrono::Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Set the expiry warning window
    pub fn with_warning_window(mut self, window: chrono::Duration) -> Self {
        self.warning_window = window;
        self
    }

    /// Set the email send timeout
    pub fn with_mail_timeout(mut self, timeout: Duration) -> Self {
        self.mail_timeout = timeout;
        self
    }

    /// Set the per-candidate timeout
    pub fn with_candidate_timeout(mut self, timeout: Duration) -> Self {
        self.candidate_timeout = timeout;
        self
    }

    /// Link to the account's subscription settings
    pub fn subscription_url(&self) -> String {
        format!("{}/account/subscription", self.app_url.trim_end_matches('/'))
    }

    /// Link to the group management page
    pub fn groups_url(&self) -> String {
        format!("{}/account/groups", self.app_url.trim_end_matches('/'))
    }
}
