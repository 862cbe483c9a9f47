//! Application state for the Hive API service.

use std::sync::Arc;
use std::time::Duration;

use hive_core::{BillingWebhook, LifecycleServices};
use hive_db::DbPool;

/// Bearer secrets checked by the auth guards
#[derive(Clone)]
pub struct Secrets {
    pub cron: String,
    pub internal_api: String,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle services (jobs, subscriptions, groups, audiences)
    pub services: Arc<LifecycleServices>,
    /// Billing webhook verifier
    pub webhook: Arc<BillingWebhook>,
    /// Database pool, absent when running on in-memory repositories
    pub pool: Option<DbPool>,
    pub secrets: Arc<Secrets>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        services: LifecycleServices,
        webhook: BillingWebhook,
        pool: Option<DbPool>,
        secrets: Secrets,
        request_timeout: Duration,
    ) -> Self {
        Self {
            services: Arc::new(services),
            webhook: Arc::new(webhook),
            pool,
            secrets: Arc::new(secrets),
            request_timeout,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("has_pool", &self.pool.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
