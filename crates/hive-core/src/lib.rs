//! Hive Core - Subscription lifecycle and group cleanup
//!
//! Business logic over the `hive-db` repositories: premium access
//! resolution, grace-period enforcement, group cascade deletion,
//! subscription transitions, group membership, notification preferences
//! and best-effort email.
//!
//! # Example
//!
//! ```rust,ignore
//! use hive_core::{LifecycleConfig, LifecycleServices, LogMailer};
//! use hive_db::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let services = LifecycleServices::new(
//!     store.repositories(),
//!     Arc::new(LogMailer),
//!     LifecycleConfig::default(),
//! );
//!
//! let report = services.enforcer.enforce_subscription_cancellations().await?;
//! println!("downgraded {}", report.downgraded);
//! ```

use std::sync::Arc;

use hive_db::Repositories;

pub mod audience;
pub mod cascade;
pub mod config;
pub mod enforcer;
pub mod error;
pub mod groups;
pub mod lifecycle;
pub mod mailer;
pub mod notify;
pub mod preferences;
pub mod premium;
pub mod templates;
pub mod webhook;

pub use audience::{NotificationAudience, Recipient};
pub use cascade::{CascadeReport, GroupCascadeDeletor, TableCount};
pub use config::LifecycleConfig;
pub use enforcer::{DowngradeDetail, EnforcementReport, GracePeriodEnforcer, WarningReport};
pub use error::{AccessCodeRejection, LifecycleError};
pub use groups::{GroupService, Redemption};
pub use lifecycle::SubscriptionService;
pub use mailer::{DevOverrideMailer, EmailMessage, HttpMailer, LogMailer, MailError, Mailer};
pub use notify::Notifier;
pub use preferences::{PreferenceService, Preferences, PreferencesChange};
pub use premium::PremiumAccessResolver;
pub use webhook::{BillingEvent, BillingWebhook, WebhookError};

/// Every lifecycle service wired to one set of repositories and one mailer
#[derive(Clone, Debug)]
pub struct LifecycleServices {
    pub premium: PremiumAccessResolver,
    pub cascade: GroupCascadeDeletor,
    pub enforcer: GracePeriodEnforcer,
    pub subscriptions: SubscriptionService,
    pub groups: GroupService,
    pub audience: NotificationAudience,
    pub preferences: PreferenceService,
}

impl LifecycleServices {
    pub fn new(repos: Repositories, mailer: Arc<dyn Mailer>, config: LifecycleConfig) -> Self {
        let notifier = Notifier::new(mailer, config.mail_timeout);
        let premium = PremiumAccessResolver::new(repos.clone());
        let cascade = GroupCascadeDeletor::new(repos.clone(), notifier.clone(), config.clone());

        Self {
            enforcer: GracePeriodEnforcer::new(
                repos.clone(),
                cascade.clone(),
                notifier.clone(),
                config.clone(),
            ),
            subscriptions: SubscriptionService::new(
                repos.clone(),
                cascade.clone(),
                notifier.clone(),
                config.clone(),
            ),
            groups: GroupService::new(repos.clone(), cascade.clone(), notifier, config),
            preferences: PreferenceService::new(repos.clone()),
            audience: NotificationAudience::new(repos, premium.clone()),
            premium,
            cascade,
        }
    }
}
