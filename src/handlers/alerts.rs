//! Alert HTTP handlers.
//!
//! - GET /api/v1/alerts - Paged delivery log
//! - POST /api/v1/alerts/test - Send a test alert through every configured channel

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        alert::{AlertResponse, AlertTestRequest, ListAlertsQuery},
        pagination::Paged,
    },
    services::alert_service,
    state::AppState,
};

/// List alerts, newest first. Filters: `status`, `channel`.
pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<Paged<AlertResponse>>, AppError> {
    let page = alert_service::list_alerts(&state.pool, auth.organization_id, &query).await?;
    Ok(Json(page))
}

/// Send a test alert.
///
/// # Request Body
///
/// ```json
/// {
///   "amount_cents": 1990,
///   "payer_name": "Maria Lima",
///   "payer_key": "maria@pix.com",
///   "description": "Teste"
/// }
/// ```
///
/// # Response
///
/// 201 Created with one alert per channel and destination. Failed
/// deliveries are reported with `status: "failed"`, not as an error.
/// Test alerts do not count towards the monthly quota.
pub async fn send_test_alert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<AlertTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let alerts = alert_service::dispatch_test_alert(
        &state.pool,
        &state.notifiers,
        auth.organization_id,
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(alerts)))
}
