//! Liveness and database readiness.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: &'static str,

    /// `connected` or `unreachable`
    pub database: &'static str,

    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`
///
/// 200 when the database answers, 503 otherwise. The body has the same
/// shape either way:
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "version": "0.1.0",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, database) = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, "healthy", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        }),
    )
}
