//! Read side of PIX transactions: filtered listing and lookup.
//!
//! Transactions are only ever written by [`crate::services::ingestion`].

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        pagination::Paged,
        pix_transaction::{ListTransactionsQuery, PixTransaction, PixTransactionResponse},
    },
};

/// `ILIKE` pattern matching `value` anywhere, with wildcards escaped.
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    organization_id: Uuid,
    query: &'a ListTransactionsQuery,
) {
    builder.push(" WHERE organization_id = ").push_bind(organization_id);
    if let Some(from) = query.from {
        builder.push(" AND occurred_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND occurred_at <= ").push_bind(to);
    }
    if let Some(min) = query.min_amount_cents {
        builder.push(" AND amount_cents >= ").push_bind(min);
    }
    if let Some(max) = query.max_amount_cents {
        builder.push(" AND amount_cents <= ").push_bind(max);
    }
    if let Some(tx_id) = non_blank(&query.tx_id) {
        builder
            .push(" AND tx_id ILIKE ")
            .push_bind(contains_pattern(tx_id));
    }
    if let Some(payer_key) = non_blank(&query.payer_key) {
        builder
            .push(" AND payer_key ILIKE ")
            .push_bind(contains_pattern(payer_key));
    }
}

/// Paged transaction list of an organization, most recent first.
///
/// # Errors
///
/// - `InvalidRequest`: `from` after `to`, or minimum amount above maximum
pub async fn list_transactions(
    pool: &DbPool,
    organization_id: Uuid,
    query: &ListTransactionsQuery,
) -> Result<Paged<PixTransactionResponse>, AppError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::InvalidRequest(
                "'from' must not be after 'to'".to_string(),
            ));
        }
    }
    if let (Some(min), Some(max)) = (query.min_amount_cents, query.max_amount_cents) {
        if min > max {
            return Err(AppError::InvalidRequest(
                "min_amount_cents must not exceed max_amount_cents".to_string(),
            ));
        }
    }

    let params = query.page_params();

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM pix_transactions");
    push_filters(&mut count, organization_id, query);
    let total_count: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM pix_transactions");
    push_filters(&mut select, organization_id, query);
    select
        .push(" ORDER BY occurred_at DESC, id LIMIT ")
        .push_bind(params.page_size())
        .push(" OFFSET ")
        .push_bind(params.offset());
    let transactions: Vec<PixTransaction> = select.build_query_as().fetch_all(pool).await?;

    Ok(Paged::new(
        transactions
            .into_iter()
            .map(PixTransactionResponse::from)
            .collect(),
        params,
        total_count,
    ))
}

/// One transaction of the organization.
///
/// # Errors
///
/// - `NotFound`: Transaction doesn't exist or belongs to another organization
pub async fn get_transaction(
    pool: &DbPool,
    organization_id: Uuid,
    transaction_id: Uuid,
) -> Result<PixTransaction, AppError> {
    sqlx::query_as::<_, PixTransaction>(
        "SELECT * FROM pix_transactions WHERE id = $1 AND organization_id = $2",
    )
    .bind(transaction_id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Transaction"))
}
