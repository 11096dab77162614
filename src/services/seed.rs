//! Demo data for local development.
//!
//! Runs only against an empty database: one organization with notification
//! settings, an active mock bank connection and ten transactions, the first
//! five of which already carry a sent alert. A fresh API key and an admin
//! token are written to the log so the API can be called right away.

use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::{JwtKeys, Role},
    models::{
        alert::AlertChannel,
        api_key::{generate_api_key, hash_api_key},
    },
};

const DEMO_TRANSACTIONS: i64 = 10;
const DEMO_NOTIFIED: i64 = 5;

/// Alert channel used for the `index`-th demo transaction.
pub fn demo_channel(index: i64) -> AlertChannel {
    if index % 2 == 0 {
        AlertChannel::Email
    } else {
        AlertChannel::Webhook
    }
}

/// Seed the database when it has no organization yet.
///
/// Returns whether anything was inserted.
pub async fn seed_demo_data(pool: &DbPool, jwt: &JwtKeys) -> Result<bool, AppError> {
    let has_organizations: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM organizations)")
            .fetch_one(pool)
            .await?;

    if has_organizations {
        tracing::debug!("Database already has organizations, skipping demo seed");
        return Ok(false);
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let organization_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO organizations (name, slug, plan, billing_email)
        VALUES ('Org Demo', 'org-demo', 'starter', 'billing@demo.com')
        RETURNING id
        "#,
    )
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO notification_settings (organization_id, emails, webhook_url, webhook_secret, enabled)
        VALUES ($1, $2, 'http://localhost:7071/mock-webhook', 'secret123', true)
        "#,
    )
    .bind(organization_id)
    .bind(vec!["alerts@demo.com".to_string()])
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO bank_connections (organization_id, provider, consent_id, status, connected_at, meta_json)
        VALUES ($1, 'mock', 'mock-consent', 'active', $2, $3)
        "#,
    )
    .bind(organization_id)
    .bind(now)
    .bind(json!({ "provider": "mock" }))
    .execute(&mut *tx)
    .await?;

    let amounts: Vec<i64> = {
        let mut rng = rand::rng();
        (0..DEMO_TRANSACTIONS)
            .map(|_| rng.random_range(100..5000) * 10)
            .collect()
    };

    for (i, amount_cents) in (0..DEMO_TRANSACTIONS).zip(amounts) {
        let notified = i < DEMO_NOTIFIED;

        let transaction_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO pix_transactions (
                organization_id, tx_id, end_to_end_id, amount_cents, occurred_at,
                payer_name, payer_key, description, raw_json, notification_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'PIX Demo', $8, $9)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(format!("TX{i:04}"))
        .bind(format!("E2E{i:04}"))
        .bind(amount_cents)
        .bind(now - Duration::minutes(i * 10))
        .bind(format!("Cliente {i}"))
        .bind(format!("cliente{i}@pix.com"))
        .bind(json!({ "source": "seed" }))
        .bind(if notified { "notified" } else { "pending" })
        .fetch_one(&mut *tx)
        .await?;

        if notified {
            let channel = demo_channel(i);
            let destination = match channel {
                AlertChannel::Email => "alerts@demo.com",
                AlertChannel::Webhook => "http://localhost:7071/mock-webhook",
            };

            sqlx::query(
                r#"
                INSERT INTO alerts (
                    organization_id, pix_transaction_id, channel, status, attempts,
                    last_attempt_at, destination, payload_json
                )
                VALUES ($1, $2, $3, 'sent', 1, $4, $5, $6)
                "#,
            )
            .bind(organization_id)
            .bind(transaction_id)
            .bind(channel.as_str())
            .bind(now - Duration::minutes(i * 5))
            .bind(destination)
            .bind(json!({ "demo": true }))
            .execute(&mut *tx)
            .await?;
        }
    }

    let api_key = generate_api_key();
    sqlx::query("INSERT INTO api_keys (organization_id, name, key_hash) VALUES ($1, 'Demo key', $2)")
        .bind(organization_id)
        .bind(hash_api_key(&api_key))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let admin_token = jwt.issue(Uuid::new_v4(), organization_id, Role::OrgAdmin)?;

    tracing::info!(organization_id = %organization_id, "Demo data seeded");
    tracing::info!(api_key = %api_key, "Demo API key (member access)");
    tracing::info!(token = %admin_token, "Demo admin token (valid 12h)");

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_alerts_alternate_channels() {
        let channels: Vec<_> = (0..DEMO_NOTIFIED).map(demo_channel).collect();

        assert_eq!(
            channels,
            vec![
                AlertChannel::Email,
                AlertChannel::Webhook,
                AlertChannel::Email,
                AlertChannel::Webhook,
                AlertChannel::Email,
            ]
        );
    }
}
