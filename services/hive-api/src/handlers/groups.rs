//! Group handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use hive_core::{CascadeReport, Redemption};
use hive_db::{AccessCodeRow, GroupRow};

use super::shared::{parse_id, record_op_duration, validate_name};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub owner_id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub created_by_id: String,
    pub group_type: String,
    pub max_members: Option<i32>,
    pub created_at: String,
}

impl From<GroupRow> for GroupResponse {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            created_by_id: row.created_by_id.to_string(),
            group_type: row.group_type,
            max_members: row.max_members,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAccessCodeRequest {
    pub admin_id: String,
    /// Omitted for an unlimited code
    pub uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AccessCodeResponse {
    pub id: String,
    pub code: String,
    pub group_id: String,
    pub uses_remaining: Option<i32>,
    pub expires_at: Option<String>,
}

impl From<AccessCodeRow> for AccessCodeResponse {
    fn from(row: AccessCodeRow) -> Self {
        Self {
            id: row.id.to_string(),
            code: row.code,
            group_id: row.group_id.to_string(),
            uses_remaining: row.uses_remaining,
            expires_at: row.expires_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub account_id: String,
    pub code: String,
}

/// Identifies the account performing a destructive group action
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub actor_id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/groups
pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> ApiResult<(StatusCode, Json<GroupResponse>)> {
    let owner_id = parse_id(&req.owner_id, "owner_id")?;
    validate_name(&req.name, "Group name")?;

    let group = state.services.groups.create_group(owner_id, &req.name).await?;

    metrics::counter!("hive_groups_created_total").increment(1);
    Ok((StatusCode::CREATED, Json(group.into())))
}

/// DELETE /api/v1/groups/{group_id}?actor_id=
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<Json<CascadeReport>> {
    let start = Instant::now();
    let group_id = parse_id(&group_id, "group_id")?;
    let caller_id = parse_id(&actor.actor_id, "actor_id")?;

    let result = state.services.groups.delete_group(caller_id, group_id).await;
    record_op_duration("delete_group", start, result.is_ok());

    Ok(Json(result?))
}

/// POST /api/v1/groups/{group_id}/access-codes
pub async fn create_access_code(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(req): Json<CreateAccessCodeRequest>,
) -> ApiResult<(StatusCode, Json<AccessCodeResponse>)> {
    let group_id = parse_id(&group_id, "group_id")?;
    let admin_id = parse_id(&req.admin_id, "admin_id")?;

    if req.expires_at.is_some_and(|at| at <= Utc::now()) {
        return Err(ApiError::BadRequest(
            "expires_at must be in the future".to_string(),
        ));
    }

    let code = state
        .services
        .groups
        .create_access_code(admin_id, group_id, req.uses, req.expires_at)
        .await?;

    Ok((StatusCode::CREATED, Json(code.into())))
}

/// POST /api/v1/access-codes/redeem
pub async fn redeem_access_code(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> ApiResult<Json<Redemption>> {
    let start = Instant::now();
    let account_id = parse_id(&req.account_id, "account_id")?;
    if req.code.trim().is_empty() {
        return Err(ApiError::BadRequest("code cannot be empty".to_string()));
    }

    let result = state
        .services
        .groups
        .redeem_access_code(account_id, &req.code)
        .await;
    record_op_duration("redeem_access_code", start, result.is_ok());

    Ok(Json(result?))
}

/// DELETE /api/v1/groups/{group_id}/members/{member_id}?actor_id=
pub async fn remove_member(
    State(state): State<AppState>,
    Path((group_id, member_id)): Path<(String, String)>,
    Query(actor): Query<ActorQuery>,
) -> ApiResult<StatusCode> {
    let group_id = parse_id(&group_id, "group_id")?;
    let member_id = parse_id(&member_id, "member_id")?;
    let admin_id = parse_id(&actor.actor_id, "actor_id")?;

    state
        .services
        .groups
        .remove_member(admin_id, group_id, member_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
