//! Dashboard HTTP handler.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError, middleware::auth::AuthContext, models::dashboard::OverviewResponse,
    services::dashboard_service, state::AppState,
};

/// `GET /api/v1/app/overview`
///
/// Totals for today, the last 7 and 30 days, the 10 latest transactions,
/// alerts sent today, active bank connections and quota usage.
pub async fn overview(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<OverviewResponse>, AppError> {
    Ok(Json(
        dashboard_service::overview(&state.pool, &state.config, auth.organization_id).await?,
    ))
}
