//! Scheduled job trigger
//!
//! An external scheduler calls `POST /api/cron/{job}` with the cron secret
//! as a bearer token. Each job reports its counts in the response body.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use hive_core::{DowngradeDetail, LifecycleError};

use crate::auth::bearer_matches;
use crate::state::AppState;

pub const ENFORCE_SUBSCRIPTIONS: &str = "enforce-subscriptions";
pub const SUBSCRIPTION_WARNING_7DAYS: &str = "subscription-warning-7days";

#[derive(Debug, Serialize)]
pub struct EnforceResponse {
    pub success: bool,
    pub job: &'static str,
    pub downgraded: usize,
    pub failed: usize,
    pub details: Vec<DowngradeDetail>,
}

#[derive(Debug, Serialize)]
pub struct WarningResponse {
    pub success: bool,
    pub job: &'static str,
    pub processed: usize,
    pub notified: usize,
    pub failed: usize,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// POST /api/cron/{job}
pub async fn run_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !bearer_matches(&headers, &state.secrets.cron) {
        tracing::warn!(job = %job, "Rejected cron request");
        metrics::counter!("hive_api_unauthorized_total", "surface" => "cron").increment(1);
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let start = Instant::now();
    let result = match job.as_str() {
        ENFORCE_SUBSCRIPTIONS => enforce_subscriptions(&state).await,
        SUBSCRIPTION_WARNING_7DAYS => warn_expiring(&state).await,
        _ => {
            tracing::warn!(job = %job, "Unknown cron job");
            return error_response(StatusCode::BAD_REQUEST, "Unknown job type");
        }
    };

    let outcome = if result.is_ok() { "ok" } else { "err" };
    metrics::histogram!(
        "hive_cron_duration_seconds",
        "job" => job.clone(),
        "result" => outcome
    )
    .record(start.elapsed().as_secs_f64());

    result.unwrap_or_else(|e| {
        tracing::error!(job = %job, error = %e, "Cron job failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    })
}

async fn enforce_subscriptions(state: &AppState) -> Result<Response, LifecycleError> {
    let report = state
        .services
        .enforcer
        .enforce_subscription_cancellations()
        .await?;

    Ok(Json(EnforceResponse {
        success: true,
        job: ENFORCE_SUBSCRIPTIONS,
        downgraded: report.downgraded,
        failed: report.failed,
        details: report.details,
    })
    .into_response())
}

async fn warn_expiring(state: &AppState) -> Result<Response, LifecycleError> {
    let report = state.services.enforcer.warn_expiring_subscriptions().await?;

    Ok(Json(WarningResponse {
        success: true,
        job: SUBSCRIPTION_WARNING_7DAYS,
        processed: report.processed,
        notified: report.notified,
        failed: report.failed,
    })
    .into_response())
}
