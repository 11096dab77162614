//! Billing service - Stripe subscription webhooks.
//!
//! Subscriptions carry the organization id in `metadata.organizationId`;
//! the subscribed price decides the plan.
//!
//! # Signature Verification
//!
//! `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]` where each `v1` is the
//! HMAC-SHA256 of `"{t}.{body}"`. Timestamps older than the tolerance are
//! rejected to limit replays.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::Config, db::DbPool, error::AppError, models::organization::Plan, services::signer,
};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Accepted clock difference between Stripe and us, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StripeSignatureError {
    #[error("Stripe-Signature header is missing or malformed")]
    Malformed,

    #[error("Stripe-Signature timestamp outside tolerance")]
    Expired,

    #[error("Stripe-Signature does not match payload")]
    Mismatch,
}

/// Stripe sends `v1` as 64 lowercase hex digits with no prefix.
fn is_stripe_hex(signature: &str) -> bool {
    signature.len() == 64
        && signature
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Verify a `Stripe-Signature` header against the raw body.
pub fn verify_stripe_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), StripeSignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp_str = timestamp.ok_or(StripeSignatureError::Malformed)?;
    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| StripeSignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(StripeSignatureError::Malformed);
    }

    let skew = now_unix
        .checked_sub(timestamp)
        .map(i64::unsigned_abs)
        .ok_or(StripeSignatureError::Expired)?;
    if skew > tolerance_secs.unsigned_abs() {
        return Err(StripeSignatureError::Expired);
    }

    let mut signed_payload = Vec::with_capacity(timestamp_str.len() + 1 + body.len());
    signed_payload.extend_from_slice(timestamp_str.as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(body);

    if signatures
        .iter()
        .filter(|signature| is_stripe_hex(signature))
        .any(|signature| signer::verify(secret, &signed_payload, signature))
    {
        Ok(())
    } else {
        Err(StripeSignatureError::Mismatch)
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub items: Option<StripeList<StripeSubscriptionItem>>,
}

#[derive(Debug, Deserialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
}

impl StripeSubscription {
    pub fn organization_id(&self) -> Option<Uuid> {
        self.metadata
            .get("organizationId")
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
    }

    /// Customer id, whether the customer is expanded or not.
    pub fn customer_id(&self) -> Option<String> {
        match self.customer.as_ref()? {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Object(object) => object
                .get("id")
                .and_then(|id| id.as_str())
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn price_id(&self) -> Option<&str> {
        self.items
            .as_ref()?
            .data
            .first()?
            .price
            .as_ref()
            .map(|p| p.id.as_str())
    }
}

/// Plan bought with a price id. Unknown prices map to the starter plan.
pub fn resolve_plan(config: &Config, price_id: Option<&str>) -> Plan {
    let Some(price_id) = price_id else {
        return Plan::Starter;
    };
    let matches = |configured: &Option<String>| {
        configured
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(price_id))
    };

    if matches(&config.stripe_price_starter) {
        Plan::Starter
    } else if matches(&config.stripe_price_pro) {
        Plan::Pro
    } else if matches(&config.stripe_price_business) {
        Plan::Business
    } else {
        Plan::Starter
    }
}

/// Process a Stripe webhook.
///
/// # Events
///
/// - `customer.subscription.created` / `updated`: set plan, subscription and customer
/// - `customer.subscription.deleted`: downgrade to starter and clear the subscription
/// - anything else: acknowledged and ignored
///
/// # Errors
///
/// - `InvalidRequest`: Signature invalid (when a secret is configured) or payload malformed
pub async fn handle_stripe_webhook(
    pool: &DbPool,
    config: &Config,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), AppError> {
    if let Some(secret) = config
        .stripe_webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        verify_stripe_signature(
            secret,
            signature.unwrap_or_default(),
            body,
            Utc::now().timestamp(),
            SIGNATURE_TOLERANCE_SECS,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected Stripe webhook");
            AppError::InvalidRequest(e.to_string())
        })?;
    }

    let event: StripeEvent = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed Stripe event: {e}")))?;

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Processing Stripe webhook");

    match event.event_type.as_str() {
        "customer.subscription.created" | "customer.subscription.updated" => {
            let subscription = parse_subscription(event.data.object)?;
            apply_subscription_change(pool, config, &subscription).await
        }
        "customer.subscription.deleted" => {
            let subscription = parse_subscription(event.data.object)?;
            downgrade_organization(pool, &subscription).await
        }
        other => {
            tracing::debug!(event_type = %other, "Stripe event not handled");
            Ok(())
        }
    }
}

fn parse_subscription(object: serde_json::Value) -> Result<StripeSubscription, AppError> {
    serde_json::from_value(object)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed Stripe subscription: {e}")))
}

async fn apply_subscription_change(
    pool: &DbPool,
    config: &Config,
    subscription: &StripeSubscription,
) -> Result<(), AppError> {
    let Some(organization_id) = subscription.organization_id() else {
        tracing::warn!(subscription_id = %subscription.id, "Subscription missing organization metadata");
        return Ok(());
    };

    let plan = resolve_plan(config, subscription.price_id());

    let updated = sqlx::query(
        r#"
        UPDATE organizations
        SET plan = $2,
            stripe_subscription_id = $3,
            stripe_customer_id = COALESCE($4, stripe_customer_id)
        WHERE id = $1
        "#,
    )
    .bind(organization_id)
    .bind(plan.as_str())
    .bind(&subscription.id)
    .bind(subscription.customer_id())
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        tracing::warn!(organization_id = %organization_id, subscription_id = %subscription.id, "Organization not found for subscription");
    } else {
        tracing::info!(organization_id = %organization_id, plan = %plan, "Subscription applied");
    }

    Ok(())
}

async fn downgrade_organization(
    pool: &DbPool,
    subscription: &StripeSubscription,
) -> Result<(), AppError> {
    let Some(organization_id) = subscription.organization_id() else {
        return Ok(());
    };

    sqlx::query(
        r#"
        UPDATE organizations
        SET plan = 'starter', stripe_subscription_id = NULL
        WHERE id = $1
        "#,
    )
    .bind(organization_id)
    .execute(pool)
    .await?;

    tracing::info!(organization_id = %organization_id, "Subscription cancelled, downgraded to starter");

    Ok(())
}
