//! Dashboard overview payload.

use serde::Serialize;

use crate::models::{organization::UsageResponse, pix_transaction::PixTransactionResponse};

/// Received PIX volume over one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodTotals {
    pub count: i64,
    pub amount_cents: i64,
}

/// Response body for `GET /api/v1/app/overview`.
///
/// Periods end now; `today` starts at midnight UTC, the others 7 and 30
/// days before that midnight.
#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub today: PeriodTotals,
    pub last_7_days: PeriodTotals,
    pub last_30_days: PeriodTotals,
    pub recent_transactions: Vec<PixTransactionResponse>,
    pub alerts_today: i64,
    pub active_connections: i64,
    pub usage: UsageResponse,
}
