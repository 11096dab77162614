//! Organization (tenant) model, subscription plan and usage window.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::string_enum;

string_enum! {
    /// Subscription plan, set by the billing webhooks.
    Plan {
        Starter => "starter",
        Pro => "pro",
        Business => "business",
    }
}

impl Plan {
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Starter => "Grátis",
            Plan::Pro => "Pro",
            Plan::Business => "Business",
        }
    }
}

/// Represents an organization record from the database.
///
/// Every other table hangs off an organization and is always filtered by
/// `organization_id`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,

    #[sqlx(try_from = "String")]
    pub plan: Plan,

    pub billing_email: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,

    /// First day of the month `usage_count` refers to.
    pub usage_month: NaiveDate,

    /// Alerts consumed during `usage_month`.
    pub usage_count: i32,

    pub created_at: DateTime<Utc>,
}

/// Response body for `GET /api/v1/quota/usage`.
///
/// `quota` is `null` for unlimited plans.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub plan: Plan,
    pub plan_name: &'static str,
    pub used: i64,
    pub quota: Option<i64>,
    pub remaining: Option<i64>,
    pub usage_month: NaiveDate,
}
