//! API key management handlers.
//!
//! - GET /api/v1/api-keys - List keys (never the key itself)
//! - POST /api/v1/api-keys - Create a key; the plaintext is returned once
//! - DELETE /api/v1/api-keys/{id} - Deactivate a key

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
    models::api_key::{ApiKey, ApiKeyResponse, CreateApiKeyRequest, generate_api_key, hash_api_key},
    state::AppState,
};

const MAX_NAME_LENGTH: usize = 120;

/// List the organization's API keys. Plaintext keys are never returned here.
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE organization_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.organization_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

/// Create an API key.
///
/// # Request Body
///
/// ```json
/// { "name": "ERP integration" }
/// ```
///
/// # Response (201)
///
/// The `key` field is only present in this response; store it safely.
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = request.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "name must have between 1 and {MAX_NAME_LENGTH} characters"
        )));
    }

    let key = generate_api_key();

    let api_key = sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (organization_id, name, key_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(auth.organization_id)
    .bind(name)
    .bind(hash_api_key(&key))
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(organization_id = %auth.organization_id, api_key_id = %api_key.id, "API key created");

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse::from(api_key).with_key(key)),
    ))
}

/// Deactivate an API key (soft delete).
///
/// Returns 204 No Content, or 404 if the key belongs to another organization.
pub async fn delete_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(api_key_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query(
        "UPDATE api_keys SET is_active = false WHERE id = $1 AND organization_id = $2",
    )
    .bind(api_key_id)
    .bind(auth.organization_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("API key"));
    }

    tracing::info!(organization_id = %auth.organization_id, api_key_id = %api_key_id, "API key deactivated");

    Ok(StatusCode::NO_CONTENT)
}
