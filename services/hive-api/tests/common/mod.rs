//! Router over in-memory repositories

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use hive_api::{build_router, AppState, Secrets};
use hive_core::{BillingWebhook, LifecycleConfig, LifecycleServices, LogMailer};
use hive_db::{AccountRow, MemoryStore, NotificationRow};
use hive_types::{SubscriptionStatus, Tier};

pub const CRON_SECRET: &str = "cron-test-secret";
pub const INTERNAL_TOKEN: &str = "internal-test-token";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub struct TestApp {
    pub store: MemoryStore,
    pub router: Router,
    pub webhook: BillingWebhook,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let config = LifecycleConfig::default().with_mail_timeout(StdDuration::from_secs(1));
        let services = LifecycleServices::new(store.repositories(), Arc::new(LogMailer), config);
        let webhook = BillingWebhook::new(WEBHOOK_SECRET);

        let state = AppState::new(
            services,
            webhook.clone(),
            None,
            Secrets {
                cron: CRON_SECRET.to_string(),
                internal_api: INTERNAL_TOKEN.to_string(),
            },
            StdDuration::from_secs(5),
        );

        Self {
            store,
            router: build_router(state, None),
            webhook,
        }
    }

    /// Insert an account with the given plan state
    pub fn account(
        &self,
        email: &str,
        tier: Tier,
        status: Option<SubscriptionStatus>,
        period_end: Option<DateTime<Utc>>,
        cancel_at_period_end: bool,
    ) -> AccountRow {
        let now = Utc::now();
        let row = AccountRow {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            subscription_tier: tier.as_str().to_string(),
            subscription_status: status.map(|s| s.as_str().to_string()),
            current_period_end: period_end,
            cancel_at_period_end,
            active_group_id: None,
            subscription_id: tier
                .is_paid()
                .then(|| format!("sub_{}", Uuid::new_v4().simple())),
            customer_id: None,
            timezone: None,
            morning_briefing_time: None,
            evening_wrapup_time: None,
            notifications: NotificationRow {
                notify_subscription_updates: true,
                ..NotificationRow::default()
            },
            created_at: now,
            updated_at: now,
        };
        self.store.insert_account(row.clone());
        row
    }

    pub fn paid(&self, email: &str, tier: Tier) -> AccountRow {
        self.account(
            email,
            tier,
            Some(SubscriptionStatus::Active),
            Some(Utc::now() + Duration::days(20)),
            false,
        )
    }

    pub fn free(&self, email: &str) -> AccountRow {
        self.account(email, Tier::Free, None, None, false)
    }

    pub fn reload(&self, id: Uuid) -> AccountRow {
        self.store.account(id).expect("account exists")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Authorized internal API request
    pub async fn internal(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {INTERNAL_TOKEN}"));
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn cron(&self, job: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/cron/{job}"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}
