//! Liveness and readiness probes

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Storage backend the service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Postgres,
    Memory,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub backend: Backend,
    pub database: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready
///
/// Pings PostgreSQL when a pool is configured. In-memory deployments are
/// always ready.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ready",
                backend: Backend::Memory,
                database: "memory",
            }),
        );
    };

    if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
        tracing::error!(error = %e, "Readiness ping failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "unavailable",
                backend: Backend::Postgres,
                database: "unreachable",
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ready",
            backend: Backend::Postgres,
            database: "connected",
        }),
    )
}
