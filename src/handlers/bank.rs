//! Bank connection and Itaú integration HTTP handlers.
//!
//! - POST /api/v1/bank/connect/init - Consent URL of the mock Open Finance provider
//! - POST /api/v1/bank/connect/callback - Complete a mock connection
//! - GET /api/v1/bank/connections - List connections
//! - POST /api/v1/bank/connections/{id}/revoke - Revoke a connection
//! - GET/PUT /api/v1/bank/itau - Itaú integration settings
//! - POST /api/v1/bank/itau/test - Test Itaú credentials

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::bank::{
        BankConnectionResponse, ConnectCallbackRequest, ConnectInitResponse,
        ItauIntegrationRequest, ItauIntegrationResponse, ItauTestRequest, ItauTestResponse,
    },
    services::{itau, open_finance},
    state::AppState,
};

/// Start the mock Open Finance consent flow.
///
/// # Response
///
/// ```json
/// { "consent_url": "https://mock.openfinance.local/consent?org=<organization id>" }
/// ```
pub async fn connect_init(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Json<ConnectInitResponse> {
    Json(ConnectInitResponse {
        consent_url: state.open_finance.create_consent_url(auth.organization_id),
    })
}

/// Complete the consent flow.
///
/// # Request Body
///
/// ```json
/// { "consent_id": "consent-123" }
/// ```
///
/// # Response
///
/// 201 Created with the new, already active, connection.
pub async fn connect_callback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ConnectCallbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let connection = state
        .open_finance
        .complete_connection(&state.pool, auth.organization_id, &request.consent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(connection)))
}

/// List the organization's bank connections.
pub async fn list_connections(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BankConnectionResponse>>, AppError> {
    Ok(Json(
        open_finance::list_connections(&state.pool, auth.organization_id).await?,
    ))
}

/// Revoke a connection. Returns 404 if it belongs to another organization.
pub async fn revoke_connection(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<BankConnectionResponse>, AppError> {
    Ok(Json(
        open_finance::revoke_connection(&state.pool, auth.organization_id, connection_id).await?,
    ))
}

/// Itaú integration settings. Secrets are reported as `has_*` flags only.
pub async fn get_itau(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ItauIntegrationResponse>, AppError> {
    let integration = itau::get_integration(&state.pool, auth.organization_id)
        .await?
        .ok_or(AppError::NotFound("Itaú integration"))?;

    Ok(Json(integration.into()))
}

/// Create or update the Itaú integration.
///
/// Omitted fields keep their stored value; an empty string clears it.
/// Saving resets `is_tested`.
pub async fn update_itau(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ItauIntegrationRequest>,
) -> Result<Json<ItauIntegrationResponse>, AppError> {
    Ok(Json(
        itau::save_integration(&state.pool, auth.organization_id, request).await?,
    ))
}

/// Test the stored credentials against the sandbox, or production with
/// `{"use_production": true}`.
///
/// A rejected test is a 200 with `success: false`.
pub async fn test_itau(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    request: Option<Json<ItauTestRequest>>,
) -> Result<Json<ItauTestResponse>, AppError> {
    let use_production = request.is_some_and(|Json(r)| r.use_production);

    Ok(Json(
        itau::test_integration(&state.pool, &state.itau, auth.organization_id, use_production)
            .await?,
    ))
}
