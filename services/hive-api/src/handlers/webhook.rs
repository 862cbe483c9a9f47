//! Billing webhook handler

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "billing-signature";

/// POST /webhooks/billing
///
/// Verify the signature, then apply invoice events to the matching account.
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let start = Instant::now();

    let signature = headers
        .get(SIGNATURE_HEADER)
        .ok_or_else(|| ApiError::BadRequest("Missing signature header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::BadRequest("Invalid signature header encoding".to_string()))?;

    let event = match state.webhook.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            metrics::counter!("hive_webhooks_processed_total", "status" => "rejected")
                .increment(1);
            return Err(e.into());
        }
    };

    if let Err(e) = state
        .webhook
        .dispatch(&event, &state.services.subscriptions)
        .await
    {
        tracing::error!(kind = %event.kind(), error = %e, "Webhook processing failed");
        metrics::counter!("hive_webhooks_processed_total", "status" => "error").increment(1);
        return Err(e.into());
    }

    metrics::counter!("hive_webhooks_processed_total", "status" => "success").increment(1);
    metrics::histogram!(
        "hive_operation_duration_seconds",
        "operation" => "process_webhook"
    )
    .record(start.elapsed().as_secs_f64());

    Ok(StatusCode::OK)
}
