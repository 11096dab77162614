//! Stripe billing webhook.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    services::billing_service::{self, SIGNATURE_HEADER},
    state::AppState,
};

/// `POST /api/v1/webhooks/stripe`
///
/// Answers `{"received": true}` for every accepted event, including the
/// ones that are ignored.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    billing_service::handle_stripe_webhook(&state.pool, &state.config, signature, &body).await?;

    Ok(Json(json!({ "received": true })))
}
