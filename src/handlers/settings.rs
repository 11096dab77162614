//! Notification settings HTTP handlers.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::notification_settings::{NotificationSettingsRequest, NotificationSettingsResponse},
    services::settings_service,
    state::AppState,
};

/// `GET /api/v1/settings/notifications`
///
/// 404 until settings are saved once.
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<NotificationSettingsResponse>, AppError> {
    Ok(Json(
        settings_service::get_settings(&state.pool, auth.organization_id).await?,
    ))
}

/// `PUT /api/v1/settings/notifications`
///
/// # Request Body
///
/// ```json
/// {
///   "emails": ["financeiro@example.com"],
///   "webhook_url": "https://example.com/pix",
///   "webhook_secret": "s3cr3t",
///   "enabled": true
/// }
/// ```
///
/// The secret may be omitted to keep the stored one.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<NotificationSettingsRequest>,
) -> Result<Json<NotificationSettingsResponse>, AppError> {
    Ok(Json(
        settings_service::save_settings(&state.pool, auth.organization_id, request).await?,
    ))
}
