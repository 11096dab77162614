//! Alert dispatcher iteration.
//!
//! 1. Oldest pending transactions (by `occurred_at`), up to the batch size,
//!    are alerted, skipped or marked `quota_exceeded` one by one
//! 2. Failed webhook alerts whose backoff elapsed are retried

use crate::{
    models::pix_transaction::NotificationStatus,
    services::alert_service::{self, RetrySummary},
    state::AppState,
};

/// Webhook retries handled per iteration.
const RETRY_BATCH_SIZE: i64 = 50;

/// One dispatcher iteration: pending transactions first, then webhook retries.
///
/// # Errors
///
/// Only failures to load the pending batch or the retry candidates.
pub async fn run_once(state: &AppState) -> anyhow::Result<()> {
    let pending =
        alert_service::pending_transactions(&state.pool, state.config.alert_batch_size).await?;

    let mut notified = 0usize;
    for transaction in &pending {
        match alert_service::process_pending_transaction(
            &state.pool,
            &state.config,
            &state.notifiers,
            transaction,
        )
        .await
        {
            Ok(NotificationStatus::Notified) => notified += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    transaction_id = %transaction.id,
                    organization_id = %transaction.organization_id,
                    error = %e,
                    "Failed to process pending transaction"
                );
            }
        }
    }

    if !pending.is_empty() {
        tracing::info!(pending = pending.len(), notified, "Pending transactions processed");
    }

    let retries = alert_service::retry_failed_webhooks(
        &state.pool,
        &state.notifiers,
        state.config.webhook_max_attempts,
        RETRY_BATCH_SIZE,
    )
    .await?;

    if retries != RetrySummary::default() {
        tracing::info!(
            sent = retries.sent,
            failed = retries.failed,
            abandoned = retries.abandoned,
            errors = retries.errors,
            "Webhook retries processed"
        );
    }

    Ok(())
}
