//! Subscription handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use hive_core::CascadeReport;
use hive_types::{pricing, PlanPricing, SubscriptionDetails, Tier};

use super::shared::{parse_id, record_op_duration};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PremiumResponse {
    pub account_id: String,
    pub has_premium_access: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub active: bool,
    pub subscription: Option<SubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub tier: String,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub immediate: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub immediate: bool,
    pub groups_deleted: Vec<CascadeReport>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/plans
pub async fn list_plans() -> Json<Vec<PlanPricing>> {
    Json(pricing().to_vec())
}

/// GET /api/v1/accounts/{account_id}/premium
pub async fn premium_access(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<PremiumResponse>> {
    let id = parse_id(&account_id, "account_id")?;
    let has_premium_access = state.services.premium.has_premium_access(id).await;

    Ok(Json(PremiumResponse {
        account_id: id.to_string(),
        has_premium_access,
    }))
}

/// GET /api/v1/accounts/{account_id}/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let id = parse_id(&account_id, "account_id")?;

    let subscription = state.services.subscriptions.subscription_details(id).await?;
    let active = state.services.subscriptions.has_active_subscription(id).await?;

    Ok(Json(SubscriptionResponse {
        active,
        subscription,
    }))
}

/// POST /api/v1/accounts/{account_id}/subscription/activate
pub async fn activate_subscription(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(req): Json<ActivateRequest>,
) -> ApiResult<Json<UpdatedResponse>> {
    let start = Instant::now();
    let id = parse_id(&account_id, "account_id")?;
    let tier: Tier = req
        .tier
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid tier: {}", req.tier)))?;

    let result = state
        .services
        .subscriptions
        .activate_subscription(id, tier, req.subscription_id, req.customer_id)
        .await;
    record_op_duration("activate_subscription", start, result.is_ok());
    result?;

    Ok(Json(UpdatedResponse { success: true }))
}

/// POST /api/v1/accounts/{account_id}/subscription/cancel
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<CancelResponse>> {
    let start = Instant::now();
    let id = parse_id(&account_id, "account_id")?;
    let immediate = req.immediate;

    let result = state
        .services
        .subscriptions
        .cancel_subscription(id, immediate)
        .await;
    record_op_duration("cancel_subscription", start, result.is_ok());

    Ok(Json(CancelResponse {
        immediate,
        groups_deleted: result?,
    }))
}

/// POST /api/v1/accounts/{account_id}/subscription/reactivate
pub async fn reactivate_subscription(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<UpdatedResponse>> {
    let id = parse_id(&account_id, "account_id")?;
    state
        .services
        .subscriptions
        .reactivate_subscription(id)
        .await?;

    Ok(Json(UpdatedResponse { success: true }))
}
