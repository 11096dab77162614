//! PIX polling iteration.
//!
//! Active mock Open Finance connections get freshly generated credits;
//! configured Itaú integrations are asked for new statement entries. One
//! failing connection or integration does not stop the others.

use crate::{
    services::{ingestion, itau, open_finance},
    state::AppState,
};

/// Poll every active source once.
///
/// # Errors
///
/// Only failures to list the sources; per-source failures are logged.
pub async fn run_once(state: &AppState) -> anyhow::Result<()> {
    poll_mock_connections(state).await?;
    poll_itau_integrations(state).await?;
    Ok(())
}

async fn poll_mock_connections(state: &AppState) -> anyhow::Result<()> {
    for connection in open_finance::active_connections(&state.pool).await? {
        let result = async {
            let transactions = state
                .open_finance
                .fetch_transactions(&state.pool, &connection)
                .await?;
            ingestion::upsert_transactions(&state.pool, connection.organization_id, transactions)
                .await
        }
        .await;

        match result {
            Ok(result) => tracing::debug!(
                connection_id = %connection.id,
                inserted = result.inserted,
                updated = result.updated,
                "Mock connection polled"
            ),
            Err(e) => tracing::error!(
                connection_id = %connection.id,
                organization_id = %connection.organization_id,
                error = %e,
                "Mock connection polling failed"
            ),
        }
    }

    Ok(())
}

async fn poll_itau_integrations(state: &AppState) -> anyhow::Result<()> {
    for integration in itau::pollable_integrations(&state.pool).await? {
        match itau::poll_integration(&state.pool, &state.itau, &integration).await {
            Ok(result) => tracing::info!(
                integration_id = %integration.id,
                inserted = result.inserted,
                updated = result.updated,
                "Itaú integration polled"
            ),
            Err(e) => tracing::error!(
                integration_id = %integration.id,
                organization_id = %integration.organization_id,
                error = %e,
                "Itaú polling failed"
            ),
        }
    }

    Ok(())
}
