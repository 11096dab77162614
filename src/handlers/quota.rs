//! Quota HTTP handler.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError, middleware::auth::AuthContext, models::organization::UsageResponse,
    services::usage_service, state::AppState,
};

/// `GET /api/v1/quota/usage`
///
/// # Response (200)
///
/// ```json
/// {
///   "plan": "starter",
///   "plan_name": "Grátis",
///   "used": 12,
///   "quota": 100,
///   "remaining": 88,
///   "usage_month": "2025-12-01"
/// }
/// ```
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UsageResponse>, AppError> {
    let organization = usage_service::get_organization(&state.pool, auth.organization_id).await?;
    Ok(Json(usage_service::usage(&state.config, &organization)))
}
