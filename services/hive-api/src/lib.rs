//! Hive API
//!
//! HTTP surface for the subscription lifecycle: scheduled jobs, the
//! internal account/group API and the billing webhook.
//!
//! ## Cron Endpoints
//!
//! - `POST /api/cron/enforce-subscriptions` - Downgrade lapsed cancellations
//! - `POST /api/cron/subscription-warning-7days` - Warn expiring subscriptions
//!
//! ## Internal Endpoints (bearer token)
//!
//! - `GET /api/v1/accounts/{id}/premium` - Premium access check
//! - `GET /api/v1/accounts/{id}/subscription` - Subscription details
//! - `POST /api/v1/accounts/{id}/subscription/activate` - Start a paid plan
//! - `POST /api/v1/accounts/{id}/subscription/cancel` - Cancel (deferred or immediate)
//! - `POST /api/v1/accounts/{id}/subscription/reactivate` - Undo a pending cancel
//! - `POST /api/v1/groups` - Create a group
//! - `DELETE /api/v1/groups/{id}` - Delete a group and its content
//! - `POST /api/v1/groups/{id}/access-codes` - Issue an access code
//! - `DELETE /api/v1/groups/{id}/members/{member_id}` - Remove a member
//! - `POST /api/v1/access-codes/redeem` - Join a group
//! - `GET /api/v1/notifications/{kind}/recipients` - Notification audience
//!
//! ## Other
//!
//! - `GET /api/plans` - Paid plan price list
//! - `POST /webhooks/billing` - Billing provider webhook
//! - `GET /health`, `GET /ready`, `GET /metrics`

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers::{health, ready};

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::{AppState, Secrets};

/// Assemble the HTTP router
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout;

    // Internal API, guarded by the internal token
    let api_v1 = Router::new()
        // Accounts
        .route("/accounts/{account_id}/premium", get(handlers::premium_access))
        .route(
            "/accounts/{account_id}/subscription",
            get(handlers::get_subscription),
        )
        .route(
            "/accounts/{account_id}/subscription/activate",
            post(handlers::activate_subscription),
        )
        .route(
            "/accounts/{account_id}/subscription/cancel",
            post(handlers::cancel_subscription),
        )
        .route(
            "/accounts/{account_id}/subscription/reactivate",
            post(handlers::reactivate_subscription),
        )
        .route(
            "/accounts/{account_id}/preferences",
            get(handlers::get_preferences).put(handlers::update_preferences),
        )
        // Groups
        .route("/groups", post(handlers::create_group))
        .route("/groups/{group_id}", delete(handlers::delete_group))
        .route(
            "/groups/{group_id}/access-codes",
            post(handlers::create_access_code),
        )
        .route(
            "/groups/{group_id}/members/{member_id}",
            delete(handlers::remove_member),
        )
        .route("/access-codes/redeem", post(handlers::redeem_access_code))
        // Notifications
        .route(
            "/notifications/{kind}/recipients",
            get(handlers::recipients),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_internal_token,
        ));

    // Cron routes check the cron secret themselves and may outlive the
    // request timeout on large scans
    let cron_routes = Router::new().route("/api/cron/{job}", post(handlers::run_job));

    // Webhook route (raw body, signature verified in the handler)
    let webhook_routes =
        Router::new().route("/webhooks/billing", post(handlers::billing_webhook));

    let public_routes = Router::new().route("/api/plans", get(handlers::list_plans));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhook_routes)
        .merge(public_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .merge(cron_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
