//! Mocked Open Finance provider.
//!
//! Consent is simulated: the consent URL points at a fake provider and the
//! callback immediately activates the connection. Polling an active
//! connection produces one or two random PIX credits.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        bank::{BankConnection, BankConnectionResponse},
        pix_transaction::NewPixTransaction,
    },
};

const PAYER_NAMES: [&str; 4] = ["Ana Souza", "Diego Andrade", "Maria Lima", "Pedro Rocha"];

/// Highest generated amount, R$ 2.500,00.
const MAX_AMOUNT_CENTS: i64 = 250_000;

#[derive(Debug, Clone)]
pub struct MockOpenFinanceProvider {
    consent_base_url: String,
}

impl MockOpenFinanceProvider {
    pub fn new(consent_base_url: impl Into<String>) -> Self {
        Self {
            consent_base_url: consent_base_url.into(),
        }
    }

    /// URL the user would be sent to for granting consent.
    pub fn create_consent_url(&self, organization_id: Uuid) -> String {
        let url = format!(
            "{}/consent?org={organization_id}",
            self.consent_base_url.trim_end_matches('/')
        );
        tracing::info!(organization_id = %organization_id, url = %url, "Generated mock consent URL");
        url
    }

    /// Activate a connection for the consent the user just granted.
    pub async fn complete_connection(
        &self,
        pool: &DbPool,
        organization_id: Uuid,
        consent_id: &str,
    ) -> Result<BankConnectionResponse, AppError> {
        let consent_id = consent_id.trim();
        if consent_id.is_empty() {
            return Err(AppError::InvalidRequest(
                "consent_id is required".to_string(),
            ));
        }

        let connection = sqlx::query_as::<_, BankConnection>(
            r#"
            INSERT INTO bank_connections (
                organization_id,
                provider,
                consent_id,
                status,
                connected_at,
                meta_json
            )
            VALUES ($1, 'mock', $2, 'active', NOW(), '{"provider":"mock"}'::jsonb)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(consent_id)
        .fetch_one(pool)
        .await?;

        tracing::info!(organization_id = %organization_id, connection_id = %connection.id, "Mock bank connection completed");

        Ok(connection.into())
    }

    /// Generate new transactions for an active connection.
    ///
    /// Transactions start 5 minutes after the organization's latest one, or
    /// 6 hours ago when it has none.
    pub async fn fetch_transactions(
        &self,
        pool: &DbPool,
        connection: &BankConnection,
    ) -> Result<Vec<NewPixTransaction>, AppError> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MAX(occurred_at) FROM pix_transactions WHERE organization_id = $1",
        )
        .bind(connection.organization_id)
        .fetch_one(pool)
        .await?;

        let start = match latest {
            Some(latest) => latest + Duration::minutes(5),
            None => Utc::now() - Duration::hours(6),
        };

        let transactions = generate_transactions(&mut rand::rng(), connection.organization_id, start);

        tracing::info!(
            organization_id = %connection.organization_id,
            count = transactions.len(),
            "Generated mock PIX transactions"
        );

        Ok(transactions)
    }
}

/// One or two random credits occurring 10 to 120 minutes after `start`.
pub fn generate_transactions(
    rng: &mut impl Rng,
    organization_id: Uuid,
    start: DateTime<Utc>,
) -> Vec<NewPixTransaction> {
    let count = rng.random_range(1..=2);

    (0..count)
        .map(|_| {
            let name = PAYER_NAMES[rng.random_range(0..PAYER_NAMES.len())];
            let key_prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
            let tx_id = Uuid::new_v4().simple().to_string()[..8].to_string();

            NewPixTransaction {
                organization_id,
                tx_id,
                end_to_end_id: format!("E2E{}", Uuid::new_v4().simple()),
                amount_cents: rng.random_range(0..=MAX_AMOUNT_CENTS),
                occurred_at: start + Duration::minutes(rng.random_range(10..120)),
                payer_name: name.to_string(),
                payer_key: format!("{key_prefix}@pix.com"),
                description: "PIX recebido - Mock".to_string(),
                raw_json: serde_json::json!({ "source": "mock" }),
            }
        })
        .collect()
}

/// Active connections of every organization, for the polling worker.
pub async fn active_connections(pool: &DbPool) -> Result<Vec<BankConnection>, AppError> {
    Ok(sqlx::query_as::<_, BankConnection>(
        "SELECT * FROM bank_connections WHERE status = 'active' AND provider = 'mock' ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?)
}

/// Connections of an organization, newest first.
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `organization_id` - Organization whose connections are listed
///
/// # Errors
///
/// - `Database`: Database error occurred
pub async fn list_connections(
    pool: &DbPool,
    organization_id: Uuid,
) -> Result<Vec<BankConnectionResponse>, AppError> {
    let connections = sqlx::query_as::<_, BankConnection>(
        "SELECT * FROM bank_connections WHERE organization_id = $1 ORDER BY created_at DESC",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await?;

    Ok(connections.into_iter().map(Into::into).collect())
}

/// Mark a connection revoked so it is no longer polled.
///
/// # Errors
///
/// - `NotFound`: Connection doesn't exist or belongs to another organization
pub async fn revoke_connection(
    pool: &DbPool,
    organization_id: Uuid,
    connection_id: Uuid,
) -> Result<BankConnectionResponse, AppError> {
    let connection = sqlx::query_as::<_, BankConnection>(
        r#"
        UPDATE bank_connections
        SET status = 'revoked'
        WHERE id = $1 AND organization_id = $2
        RETURNING *
        "#,
    )
    .bind(connection_id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Bank connection"))?;

    tracing::info!(connection_id = %connection_id, "Bank connection revoked");

    Ok(connection.into())
}
