//! Itaú PIX integration: configuration, polling and webhooks.

/// OAuth and PIX API calls
pub mod client;
/// Statement entry normalization
pub mod mapper;
/// Wire payloads
pub mod models;
/// Signed inbound webhooks
pub mod webhook;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::bank::{
        BANK_ITAU, BankApiIntegration, ItauIntegrationRequest, ItauIntegrationResponse,
        ItauTestResponse,
    },
    services::ingestion::{self, UpsertResult},
};

use client::ItauClient;

/// Default polling window for an integration never polled before.
const FIRST_POLL_WINDOW_HOURS: i64 = 1;

/// The organization's Itaú integration, if one was saved.
///
/// # Errors
///
/// - `Database`: Database error occurred
pub async fn get_integration(
    pool: &DbPool,
    organization_id: Uuid,
) -> Result<Option<BankApiIntegration>, AppError> {
    Ok(sqlx::query_as::<_, BankApiIntegration>(
        "SELECT * FROM bank_api_integrations WHERE organization_id = $1 AND bank = $2",
    )
    .bind(organization_id)
    .bind(BANK_ITAU)
    .fetch_optional(pool)
    .await?)
}

/// Create or update the organization's Itaú integration.
///
/// # Errors
///
/// - `InvalidRequest`: Certificate, service URL or production settings invalid
pub async fn save_integration(
    pool: &DbPool,
    organization_id: Uuid,
    request: ItauIntegrationRequest,
) -> Result<ItauIntegrationResponse, AppError> {
    let stored = get_integration(pool, organization_id).await?;
    let values = request.merge(stored).map_err(AppError::InvalidRequest)?;

    let integration = sqlx::query_as::<_, BankApiIntegration>(
        r#"
        INSERT INTO bank_api_integrations (
            organization_id,
            bank,
            sandbox_client_id,
            sandbox_client_secret,
            production_client_id,
            production_client_secret,
            certificate_file_name,
            certificate_password,
            certificate_base64,
            production_enabled,
            service_url,
            api_key,
            account_identifier,
            webhook_secret
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (organization_id, bank) DO UPDATE
        SET sandbox_client_id = EXCLUDED.sandbox_client_id,
            sandbox_client_secret = EXCLUDED.sandbox_client_secret,
            production_client_id = EXCLUDED.production_client_id,
            production_client_secret = EXCLUDED.production_client_secret,
            certificate_file_name = EXCLUDED.certificate_file_name,
            certificate_password = EXCLUDED.certificate_password,
            certificate_base64 = EXCLUDED.certificate_base64,
            production_enabled = EXCLUDED.production_enabled,
            service_url = EXCLUDED.service_url,
            api_key = EXCLUDED.api_key,
            account_identifier = EXCLUDED.account_identifier,
            webhook_secret = EXCLUDED.webhook_secret,
            is_tested = false,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(organization_id)
    .bind(BANK_ITAU)
    .bind(values.sandbox_client_id)
    .bind(values.sandbox_client_secret)
    .bind(values.production_client_id)
    .bind(values.production_client_secret)
    .bind(values.certificate_file_name)
    .bind(values.certificate_password)
    .bind(values.certificate_base64)
    .bind(values.production_enabled)
    .bind(values.service_url)
    .bind(values.api_key)
    .bind(values.account_identifier)
    .bind(values.webhook_secret)
    .fetch_one(pool)
    .await?;

    tracing::info!(organization_id = %organization_id, integration_id = %integration.id, "Itaú integration saved");

    Ok(integration.into())
}

/// Test the stored credentials and remember a success.
///
/// # Errors
///
/// - `NotFound`: Organization has no Itaú integration
pub async fn test_integration(
    pool: &DbPool,
    client: &ItauClient,
    organization_id: Uuid,
    use_production: bool,
) -> Result<ItauTestResponse, AppError> {
    let integration = get_integration(pool, organization_id)
        .await?
        .ok_or(AppError::NotFound("Itaú integration"))?;

    let outcome = client.test_credentials(&integration, use_production).await;
    let tested_at = Utc::now();

    if outcome.success {
        sqlx::query(
            r#"
            UPDATE bank_api_integrations
            SET is_tested = true, last_tested_at = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(integration.id)
        .bind(tested_at)
        .execute(pool)
        .await?;
    }

    tracing::info!(
        integration_id = %integration.id,
        use_production,
        success = outcome.success,
        "Itaú credentials tested"
    );

    Ok(ItauTestResponse {
        success: outcome.success,
        status_code: outcome.status_code,
        message: outcome.message,
        tested_at,
    })
}

/// Integrations with enough configuration to be polled.
pub async fn pollable_integrations(pool: &DbPool) -> Result<Vec<BankApiIntegration>, AppError> {
    let integrations = sqlx::query_as::<_, BankApiIntegration>(
        r#"
        SELECT * FROM bank_api_integrations
        WHERE bank = $1
          AND COALESCE(TRIM(account_identifier), '') <> ''
          AND COALESCE(TRIM(api_key), '') <> ''
        ORDER BY created_at
        "#,
    )
    .bind(BANK_ITAU)
    .fetch_all(pool)
    .await?;

    Ok(integrations.into_iter().filter(|i| i.can_poll()).collect())
}

/// Fetch new statement entries of one integration and upsert them.
///
/// `last_polled_at` only advances after a successful fetch.
pub async fn poll_integration(
    pool: &DbPool,
    client: &ItauClient,
    integration: &BankApiIntegration,
) -> Result<UpsertResult, AppError> {
    let to = Utc::now();
    let from = integration
        .last_polled_at
        .unwrap_or(to - chrono::Duration::hours(FIRST_POLL_WINDOW_HOURS));

    let transactions = client.fetch_transactions(integration, from, to).await?;
    let result =
        ingestion::upsert_transactions(pool, integration.organization_id, transactions).await?;

    sqlx::query("UPDATE bank_api_integrations SET last_polled_at = $2 WHERE id = $1")
        .bind(integration.id)
        .bind(to)
        .execute(pool)
        .await?;

    Ok(result)
}
