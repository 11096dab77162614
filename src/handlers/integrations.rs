//! Inbound Itaú webhook.
//!
//! `POST /api/v1/integrations/itau/webhook/{integration_id}` is public; the
//! per-integration HMAC signature authenticates the caller. The raw body is
//! taken as bytes so the signature is checked over exactly what was sent.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    services::itau::webhook::{
        self, EVENT_HEADER, EVENT_ID_HEADER, SIGNATURE_HEADER, WebhookAck, WebhookHeaders,
    },
    state::AppState,
};

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// # Responses
///
/// - 200 with `duplicate: true` when the event id was already processed
/// - 401 for a missing secret or a bad signature, 404 for an unknown integration
/// - 400 for a body that is not JSON
pub async fn itau_webhook(
    State(state): State<AppState>,
    Path(integration_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let webhook_headers = WebhookHeaders {
        signature: header(&headers, SIGNATURE_HEADER),
        event_type: header(&headers, EVENT_HEADER),
        event_id: header(&headers, EVENT_ID_HEADER),
    };

    let ack = webhook::handle_webhook(&state.pool, integration_id, webhook_headers, &body).await?;

    Ok(Json(ack))
}
