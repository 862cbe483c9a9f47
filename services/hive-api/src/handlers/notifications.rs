//! Notification audience and preference handlers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use hive_core::{Preferences, PreferencesChange, Recipient};
use hive_types::NotificationType;

use super::shared::{parse_id, record_op_duration};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecipientsQuery {
    /// Delivery hour (0-23); required for briefings, ignored otherwise
    pub hour: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RecipientsResponse {
    pub kind: NotificationType,
    pub count: usize,
    pub recipients: Vec<Recipient>,
}

/// GET /api/v1/notifications/{kind}/recipients
pub async fn recipients(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<RecipientsQuery>,
) -> ApiResult<Json<RecipientsResponse>> {
    let kind: NotificationType = kind
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown notification type: {kind}")))?;

    let audience = &state.services.audience;
    let recipients = match kind {
        NotificationType::MorningBriefing | NotificationType::EveningWrapup => {
            let hour = query
                .hour
                .filter(|h| *h < 24)
                .ok_or_else(|| ApiError::BadRequest("hour (0-23) is required".to_string()))?;
            audience.accounts_for_briefing(kind, hour).await?
        }
        _ => audience.accounts_for_notification(kind).await?,
    };

    Ok(Json(RecipientsResponse {
        kind,
        count: recipients.len(),
        recipients,
    }))
}

/// GET /api/v1/accounts/{account_id}/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Preferences>> {
    let id = parse_id(&account_id, "account_id")?;
    let prefs = state.services.preferences.get_preferences(id).await?;
    Ok(Json(prefs))
}

/// PUT /api/v1/accounts/{account_id}/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(change): Json<PreferencesChange>,
) -> ApiResult<Json<Preferences>> {
    let start = Instant::now();
    let id = parse_id(&account_id, "account_id")?;

    let result = state
        .services
        .preferences
        .update_preferences(id, change)
        .await;
    record_op_duration("update_preferences", start, result.is_ok());

    Ok(Json(result?))
}
