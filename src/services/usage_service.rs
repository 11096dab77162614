//! Usage service - plan quotas and the monthly alert counter.
//!
//! Each organization stores `usage_month` (first day of a UTC month) and
//! `usage_count`. A stored month that differs from the current one means
//! the counter belongs to a past month and counts as zero.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::organization::{Organization, Plan, UsageResponse},
};

/// Monthly alert quota of a plan. `None` means unlimited.
pub fn resolve_quota(config: &Config, plan: Plan) -> Option<i64> {
    match plan {
        Plan::Starter => Some(config.starter_monthly_quota),
        Plan::Pro => Some(config.pro_monthly_quota),
        Plan::Business => None,
    }
}

/// First day of the UTC month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today.with_day(1).unwrap_or(today)
}

/// Count that applies in `current_month`.
pub fn effective_count(usage_month: NaiveDate, usage_count: i64, current_month: NaiveDate) -> i64 {
    if usage_month == current_month {
        usage_count
    } else {
        0
    }
}

/// Counter after consuming `amount`, or `None` when the quota would be exceeded.
///
/// Mirrors the conditional update in [`try_consume`].
pub fn next_count(
    usage_month: NaiveDate,
    usage_count: i64,
    current_month: NaiveDate,
    amount: i64,
    quota: Option<i64>,
) -> Option<i64> {
    let next = effective_count(usage_month, usage_count, current_month) + amount;
    match quota {
        Some(limit) if next > limit => None,
        _ => Some(next),
    }
}

/// Consume `amount` alerts from the organization's monthly quota.
///
/// # Process
///
/// A single conditional `UPDATE` rolls the month over, checks the quota and
/// increments the counter, so concurrent callers cannot overshoot.
///
/// # Returns
///
/// `true` when the amount was consumed, `false` when it would exceed the quota.
pub async fn try_consume<'e>(
    executor: impl PgExecutor<'e>,
    config: &Config,
    organization: &Organization,
    amount: i64,
) -> Result<bool, AppError> {
    let quota = resolve_quota(config, organization.plan);
    let current_month = month_start(Utc::now());

    let updated: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE organizations
        SET usage_count = CASE WHEN usage_month = $2 THEN usage_count + $3 ELSE $3 END,
            usage_month = $2
        WHERE id = $1
          AND ($4::BIGINT IS NULL
               OR (CASE WHEN usage_month = $2 THEN usage_count ELSE 0 END) + $3 <= $4)
        RETURNING usage_count
        "#,
    )
    .bind(organization.id)
    .bind(current_month)
    .bind(amount as i32)
    .bind(quota)
    .fetch_optional(executor)
    .await?;

    match updated {
        Some(count) => {
            tracing::debug!(
                organization_id = %organization.id,
                usage_count = count,
                "Usage consumed"
            );
            Ok(true)
        }
        None => {
            tracing::warn!(
                organization_id = %organization.id,
                plan = %organization.plan,
                quota = ?quota,
                "Monthly quota exhausted"
            );
            Ok(false)
        }
    }
}

/// Current usage of an organization.
pub fn usage(config: &Config, organization: &Organization) -> UsageResponse {
    let current_month = month_start(Utc::now());
    let used = effective_count(
        organization.usage_month,
        i64::from(organization.usage_count),
        current_month,
    );
    let quota = resolve_quota(config, organization.plan);

    UsageResponse {
        plan: organization.plan,
        plan_name: organization.plan.display_name(),
        used,
        quota,
        remaining: quota.map(|q| (q - used).max(0)),
        usage_month: current_month,
    }
}

/// Load an organization by id.
pub async fn get_organization<'e>(
    executor: impl PgExecutor<'e>,
    organization_id: Uuid,
) -> Result<Organization, AppError> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(organization_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Organization"))
}
