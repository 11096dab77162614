//! Alert models: delivery records, the payload sent to recipients and
//! the alert API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{pagination::PageParams, pix_transaction::PixTransaction, string_enum};

string_enum! {
    AlertChannel {
        Email => "email",
        Webhook => "webhook",
    }
}

string_enum! {
    AlertStatus {
        Pending => "pending",
        Sent => "sent",
        Failed => "failed",
    }
}

/// Alert delivery record.
///
/// # Database Table
///
/// Maps to the `alerts` table. One row per channel and destination; test
/// alerts have no `pix_transaction_id`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub pix_transaction_id: Option<Uuid>,

    #[sqlx(try_from = "String")]
    pub channel: AlertChannel,

    #[sqlx(try_from = "String")]
    pub status: AlertStatus,

    pub attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,

    /// Email address or webhook URL the alert went to.
    pub destination: String,

    pub payload_json: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Alert ready to be inserted after a delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub pix_transaction_id: Option<Uuid>,
    pub channel: AlertChannel,
    pub status: AlertStatus,
    pub destination: String,
    pub payload_json: serde_json::Value,
    pub error_message: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Event types carried in [`AlertPayload::event_type`].
pub const EVENT_PIX_RECEIVED: &str = "pix.received";
pub const EVENT_ALERT_TEST: &str = "alert.test";

/// JSON body delivered to webhook receivers and used as email body.
///
/// # Example
///
/// ```json
/// {
///   "event_type": "pix.received",
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2025-01-15T10:30:00Z",
///   "data": {
///     "transaction_id": "770e8400-...",
///     "tx_id": "9f2c1a7b",
///     "end_to_end_id": "E2E...",
///     "amount_cents": 15075,
///     "payer_name": "Maria Lima",
///     "payer_key": "mar@pix.com",
///     "description": "PIX recebido",
///     "occurred_at": "2025-01-15T10:29:58Z"
///   }
/// }
/// ```
///
/// # Signature Verification
///
/// Webhook requests carry `X-NotificaPix-Signature: sha256=<hex>`, the
/// HMAC-SHA256 of the exact body bytes keyed with the organization's
/// webhook secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub event_type: String,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub data: AlertPayloadData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayloadData {
    pub transaction_id: Option<Uuid>,
    pub tx_id: Option<String>,
    pub end_to_end_id: Option<String>,
    pub amount_cents: i64,
    pub payer_name: String,
    pub payer_key: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AlertPayload {
    /// Payload announcing a received transaction.
    pub fn for_transaction(event_id: Uuid, transaction: &PixTransaction) -> Self {
        Self {
            event_type: EVENT_PIX_RECEIVED.to_string(),
            event_id,
            created_at: Utc::now(),
            data: AlertPayloadData {
                transaction_id: Some(transaction.id),
                tx_id: Some(transaction.tx_id.clone()),
                end_to_end_id: Some(transaction.end_to_end_id.clone()),
                amount_cents: transaction.amount_cents,
                payer_name: transaction.payer_name.clone(),
                payer_key: Some(transaction.payer_key.clone()),
                description: Some(transaction.description.clone()),
                occurred_at: transaction.occurred_at,
            },
        }
    }

    /// Payload for a manually triggered test alert.
    pub fn for_test(event_id: Uuid, request: &AlertTestRequest) -> Self {
        let now = Utc::now();
        Self {
            event_type: EVENT_ALERT_TEST.to_string(),
            event_id,
            created_at: now,
            data: AlertPayloadData {
                transaction_id: None,
                tx_id: None,
                end_to_end_id: None,
                amount_cents: request.amount_cents,
                payer_name: request.payer_name.clone(),
                payer_key: request.payer_key.clone(),
                description: request.description.clone(),
                occurred_at: now,
            },
        }
    }
}

/// Request body for `POST /api/v1/alerts/test`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertTestRequest {
    pub amount_cents: i64,
    pub payer_name: String,
    pub payer_key: Option<String>,
    pub description: Option<String>,
}

impl AlertTestRequest {
    /// Amount must be positive and the payer named.
    pub fn validate(&self) -> Result<(), String> {
        if self.amount_cents <= 0 {
            return Err("amount_cents must be positive".to_string());
        }
        if self.payer_name.trim().is_empty() {
            return Err("payer_name is required".to_string());
        }
        Ok(())
    }
}

/// Query parameters for `GET /api/v1/alerts`.
#[derive(Debug, Default, Deserialize)]
pub struct ListAlertsQuery {
    pub status: Option<AlertStatus>,
    pub channel: Option<AlertChannel>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListAlertsQuery {
    pub fn page_params(&self) -> PageParams {
        let defaults = PageParams::default();
        PageParams {
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub id: Uuid,
    pub pix_transaction_id: Option<Uuid>,
    pub channel: AlertChannel,
    pub status: AlertStatus,
    pub attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub destination: String,
    pub payload_json: serde_json::Value,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            pix_transaction_id: alert.pix_transaction_id,
            channel: alert.channel,
            status: alert.status,
            attempts: alert.attempts,
            last_attempt_at: alert.last_attempt_at,
            destination: alert.destination,
            payload_json: alert.payload_json,
            error_message: alert.error_message,
            created_at: alert.created_at,
        }
    }
}

impl From<NewAlert> for AlertResponse {
    fn from(alert: NewAlert) -> Self {
        Self {
            id: alert.id,
            pix_transaction_id: alert.pix_transaction_id,
            channel: alert.channel,
            status: alert.status,
            attempts: 1,
            last_attempt_at: Some(alert.attempted_at),
            destination: alert.destination,
            payload_json: alert.payload_json,
            error_message: alert.error_message,
            created_at: alert.attempted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> AlertTestRequest {
        AlertTestRequest {
            amount_cents: 1000,
            payer_name: "Ana Souza".to_string(),
            payer_key: None,
            description: None,
        }
    }

    #[test]
    fn test_request_requires_positive_amount_and_payer() {
        assert!(test_request().validate().is_ok());

        let zero = AlertTestRequest {
            amount_cents: 0,
            ..test_request()
        };
        assert!(zero.validate().is_err());

        let blank_payer = AlertTestRequest {
            payer_name: "   ".to_string(),
            ..test_request()
        };
        assert!(blank_payer.validate().is_err());
    }

    #[test]
    fn test_payload_has_no_transaction_reference() {
        let payload = AlertPayload::for_test(Uuid::new_v4(), &test_request());

        assert_eq!(payload.event_type, EVENT_ALERT_TEST);
        assert!(payload.data.transaction_id.is_none());
        assert_eq!(payload.data.amount_cents, 1000);
    }

    #[test]
    fn channel_and_status_deserialize_from_query_strings() {
        let query: ListAlertsQuery =
            serde_json::from_str(r#"{"status":"failed","channel":"webhook"}"#).unwrap();

        assert_eq!(query.status, Some(AlertStatus::Failed));
        assert_eq!(query.channel, Some(AlertChannel::Webhook));
    }
}
