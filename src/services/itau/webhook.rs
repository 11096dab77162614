//! Inbound Itaú webhooks.
//!
//! # Security
//!
//! - Each integration has its own webhook secret; without one, deliveries are refused
//! - `X-Itau-Signature` must be the HMAC-SHA256 of the raw body
//! - Event ids are recorded, so a replayed event is acknowledged but not reprocessed

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        bank::{BANK_ITAU, BankApiIntegration, present},
        truncate_chars,
    },
    services::{ingestion, itau::mapper, signer},
};

pub const SIGNATURE_HEADER: &str = "X-Itau-Signature";
pub const EVENT_HEADER: &str = "X-Itau-Event";
pub const EVENT_ID_HEADER: &str = "X-Itau-Event-Id";

const DEFAULT_EVENT_TYPE: &str = "pix";

const MAX_EVENT_ID_CHARS: usize = 128;
const MAX_EVENT_TYPE_CHARS: usize = 64;
const MAX_SIGNATURE_CHARS: usize = 256;

/// Headers of a webhook delivery.
#[derive(Debug, Default, Clone)]
pub struct WebhookHeaders {
    pub signature: Option<String>,
    pub event_type: Option<String>,
    pub event_id: Option<String>,
}

/// Response body acknowledging a webhook delivery.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub event_id: String,
    pub duplicate: bool,
    pub inserted: usize,
    pub updated: usize,
}

/// Event id from the header, or the SHA-256 of the body when absent.
///
/// Header ids too long to store are replaced by their own SHA-256, which
/// keeps distinct ids distinct.
pub fn resolve_event_id(header: Option<&str>, body: &[u8]) -> String {
    match header.map(str::trim).filter(|h| !h.is_empty()) {
        Some(id) if id.chars().count() > MAX_EVENT_ID_CHARS => {
            hex::encode(Sha256::digest(id.as_bytes()))
        }
        Some(id) => id.to_string(),
        None => hex::encode(Sha256::digest(body)),
    }
}

/// Event type from the header, cut to its column width.
pub fn resolve_event_type(header: Option<&str>) -> String {
    let event_type = header
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_EVENT_TYPE);
    truncate_chars(event_type, MAX_EVENT_TYPE_CHARS).to_string()
}

/// Process a webhook delivered for an Itaú integration.
///
/// # Process
///
/// 1. Load the integration (404) and require its webhook secret (401)
/// 2. Verify `X-Itau-Signature` over the raw body (401)
/// 3. Parse the body (400); an already recorded event id is acknowledged as duplicate
/// 4. Normalize credit entries and upsert them for the integration's organization
/// 5. Record the event
///
/// Upserting is idempotent, so two concurrent deliveries of one event are harmless.
pub async fn handle_webhook(
    pool: &DbPool,
    integration_id: Uuid,
    headers: WebhookHeaders,
    body: &[u8],
) -> Result<WebhookAck, AppError> {
    let integration = sqlx::query_as::<_, BankApiIntegration>(
        "SELECT * FROM bank_api_integrations WHERE id = $1 AND bank = $2",
    )
    .bind(integration_id)
    .bind(BANK_ITAU)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Integration"))?;

    let secret = present(&integration.webhook_secret).ok_or_else(|| {
        tracing::warn!(integration_id = %integration_id, "Itaú webhook received without configured secret");
        AppError::Unauthorized
    })?;

    let signature = headers.signature.as_deref().unwrap_or_default();
    if !signer::verify(secret, body, signature) {
        tracing::warn!(integration_id = %integration_id, "Itaú webhook signature mismatch");
        return Err(AppError::InvalidSignature);
    }

    let payload: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed webhook payload: {e}")))?;

    let event_id = resolve_event_id(headers.event_id.as_deref(), body);
    let event_type = resolve_event_type(headers.event_type.as_deref());

    let already_recorded: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM bank_webhook_events
            WHERE bank_api_integration_id = $1 AND event_id = $2
        )
        "#,
    )
    .bind(integration.id)
    .bind(&event_id)
    .fetch_one(pool)
    .await?;

    if already_recorded {
        tracing::info!(integration_id = %integration_id, event_id = %event_id, "Duplicate Itaú webhook ignored");
        return Ok(WebhookAck {
            event_id,
            duplicate: true,
            inserted: 0,
            updated: 0,
        });
    }

    let entries = mapper::entries_from_body(payload);
    let transactions = mapper::map_credits(&entries, integration.organization_id);
    let result =
        ingestion::upsert_transactions(pool, integration.organization_id, transactions).await?;

    let recorded = sqlx::query(
        r#"
        INSERT INTO bank_webhook_events (
            bank_api_integration_id,
            organization_id,
            bank,
            event_id,
            event_type,
            signature,
            payload
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (bank_api_integration_id, event_id) DO NOTHING
        "#,
    )
    .bind(integration.id)
    .bind(integration.organization_id)
    .bind(BANK_ITAU)
    .bind(&event_id)
    .bind(&event_type)
    .bind(truncate_chars(signature.trim(), MAX_SIGNATURE_CHARS))
    .bind(String::from_utf8_lossy(body).as_ref())
    .execute(pool)
    .await?
    .rows_affected();

    tracing::info!(
        integration_id = %integration_id,
        event_id = %event_id,
        event_type = %event_type,
        entries = entries.len(),
        inserted = result.inserted,
        updated = result.updated,
        "Itaú webhook processed"
    );

    Ok(WebhookAck {
        event_id,
        duplicate: recorded == 0,
        inserted: result.inserted,
        updated: result.updated,
    })
}
