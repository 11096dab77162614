//! PIX transaction data models and API request/response types.
//!
//! This module defines:
//! - `PixTransaction`: Database entity for a received PIX credit
//! - `NewPixTransaction`: A transaction as produced by a bank source, before dedup
//! - `PixTransactionResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{pagination::PageParams, string_enum, truncate_chars};

string_enum! {
    /// Where a transaction stands in the alert pipeline.
    NotificationStatus {
        Pending => "pending",
        Notified => "notified",
        Skipped => "skipped",
        QuotaExceeded => "quota_exceeded",
    }
}

/// Represents a PIX transaction record from the database.
///
/// # Identity
///
/// A transaction is identified inside its organization by `end_to_end_id`
/// (assigned by the PIX network) and, failing that, by `tx_id`. Both are
/// compared case-insensitively; blank values never identify anything.
///
/// # Amount Storage
///
/// Amounts are stored as `i64` cents of BRL (R$ 10,50 is 1050).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PixTransaction {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub tx_id: String,
    pub end_to_end_id: String,
    pub amount_cents: i64,
    pub occurred_at: DateTime<Utc>,
    pub payer_name: String,
    pub payer_key: String,
    pub description: String,

    /// Original payload as received from the bank source.
    pub raw_json: serde_json::Value,

    #[sqlx(try_from = "String")]
    pub notification_status: NotificationStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transaction produced by a bank source (mock provider, Itaú poll or
/// Itaú webhook) before deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPixTransaction {
    pub organization_id: Uuid,
    pub tx_id: String,
    pub end_to_end_id: String,
    pub amount_cents: i64,
    pub occurred_at: DateTime<Utc>,
    pub payer_name: String,
    pub payer_key: String,
    pub description: String,
    pub raw_json: serde_json::Value,
}

/// Width of `tx_id` and `end_to_end_id`.
pub const MAX_ID_CHARS: usize = 128;
/// Width of `payer_name` and `payer_key`.
pub const MAX_PARTY_CHARS: usize = 256;

impl NewPixTransaction {
    /// Cut identifiers and payer fields to their column widths.
    pub fn bounded(mut self) -> Self {
        fn cut(value: &mut String, max_chars: usize) {
            let len = truncate_chars(value, max_chars).len();
            value.truncate(len);
        }

        cut(&mut self.tx_id, MAX_ID_CHARS);
        cut(&mut self.end_to_end_id, MAX_ID_CHARS);
        cut(&mut self.payer_name, MAX_PARTY_CHARS);
        cut(&mut self.payer_key, MAX_PARTY_CHARS);
        self
    }
}

/// Query parameters for `GET /api/v1/transactions`.
///
/// `tx_id` and `payer_key` match substrings.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub min_amount_cents: Option<i64>,
    pub max_amount_cents: Option<i64>,
    pub tx_id: Option<String>,
    pub payer_key: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListTransactionsQuery {
    pub fn page_params(&self) -> PageParams {
        let defaults = PageParams::default();
        PageParams {
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        }
    }
}

/// Response returned for transaction endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "tx_id": "9f2c1a7b",
///   "end_to_end_id": "E2E5d0c...",
///   "amount_cents": 15075,
///   "occurred_at": "2025-12-21T16:00:00Z",
///   "payer_name": "Maria Lima",
///   "payer_key": "mar@pix.com",
///   "description": "PIX recebido - Mock",
///   "notification_status": "notified"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct PixTransactionResponse {
    pub id: Uuid,
    pub tx_id: String,
    pub end_to_end_id: String,
    pub amount_cents: i64,
    pub occurred_at: DateTime<Utc>,
    pub payer_name: String,
    pub payer_key: String,
    pub description: String,
    pub notification_status: NotificationStatus,
}

/// Drops `organization_id` and the raw bank payload.
impl From<PixTransaction> for PixTransactionResponse {
    fn from(transaction: PixTransaction) -> Self {
        Self {
            id: transaction.id,
            tx_id: transaction.tx_id,
            end_to_end_id: transaction.end_to_end_id,
            amount_cents: transaction.amount_cents,
            occurred_at: transaction.occurred_at,
            payer_name: transaction.payer_name,
            payer_key: transaction.payer_key,
            description: transaction.description,
            notification_status: transaction.notification_status,
        }
    }
}

/// Format cents as Brazilian reais, e.g. `123456` -> `R$ 1.234,56`.
pub fn format_brl(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let cents = amount_cents.unsigned_abs();
    let reais = (cents / 100).to_string();

    let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
    for (i, digit) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{sign}R$ {grouped},{:02}", cents % 100)
}
