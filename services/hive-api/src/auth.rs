//! Bearer token guards

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Whether the `Authorization` header carries `Bearer <secret>`.
/// An empty secret never matches.
pub fn bearer_matches(headers: &HeaderMap, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };
    bool::from(token.trim().as_bytes().ct_eq(secret.as_bytes()))
}

/// Middleware guarding the internal API
pub async fn require_internal_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !bearer_matches(request.headers(), &state.secrets.internal_api) {
        tracing::warn!(path = %request.uri().path(), "Rejected internal API request");
        metrics::counter!("hive_api_unauthorized_total", "surface" => "internal").increment(1);
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}
