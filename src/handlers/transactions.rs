//! PIX transaction HTTP handlers.
//!
//! This module implements read-only transaction endpoints:
//! - GET /api/v1/transactions - Paged list with filters
//! - GET /api/v1/transactions/{id} - Get transaction details

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        pagination::Paged,
        pix_transaction::{ListTransactionsQuery, PixTransactionResponse},
    },
    services::transaction_service,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

/// List the organization's PIX transactions.
///
/// # Query Parameters
///
/// - `from`, `to`: RFC 3339 bounds on `occurred_at`
/// - `min_amount_cents`, `max_amount_cents`
/// - `tx_id`, `payer_key`: substring match, case-insensitive
/// - `page`, `page_size`
///
/// # Response (200)
///
/// ```json
/// {
///   "items": [{ "id": "770e8400-...", "amount_cents": 15075, "notification_status": "notified" }],
///   "page": 1,
///   "page_size": 20,
///   "total_count": 1
/// }
/// ```
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Paged<PixTransactionResponse>>, AppError> {
    let page =
        transaction_service::list_transactions(&state.pool, auth.organization_id, &query).await?;

    Ok(Json(page))
}

/// Get transaction by ID.
///
/// # Security
///
/// Returns 404 if the transaction belongs to another organization.
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<PixTransactionResponse>, AppError> {
    let transaction =
        transaction_service::get_transaction(&state.pool, auth.organization_id, transaction_id)
            .await?;

    Ok(Json(transaction.into()))
}
