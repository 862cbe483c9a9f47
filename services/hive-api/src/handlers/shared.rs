//! Shared handler utilities

use std::time::Instant;

use uuid::Uuid;

use crate::error::ApiError;

/// Maximum length for user-provided names
pub const MAX_NAME_LEN: usize = 100;

/// Parse an id from a request body or path
pub fn parse_id(value: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

/// Validate a display name is present and within bounds
pub fn validate_name(value: &str, field: &str) -> Result<(), ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "{field} too long (max {MAX_NAME_LEN} chars)"
        )));
    }
    Ok(())
}

/// Record operation duration with a result label
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "hive_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}
