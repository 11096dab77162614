//! Dashboard aggregates.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::{
        dashboard::{OverviewResponse, PeriodTotals},
        pix_transaction::{PixTransaction, PixTransactionResponse},
    },
    services::usage_service,
};

const RECENT_TRANSACTIONS: i64 = 10;

/// Start of today, 7 days and 30 days before it (UTC).
pub fn period_starts(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, DateTime<Utc>) {
    let today = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);
    (today, today - Duration::days(7), today - Duration::days(30))
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    today_count: i64,
    today_amount: i64,
    week_count: i64,
    week_amount: i64,
    month_count: i64,
    month_amount: i64,
}

/// Dashboard overview of an organization.
///
/// # Contents
///
/// - transaction count and amount for today, the last 7 and the last 30 days
/// - the 10 most recent transactions
/// - alerts created today and active bank connections
/// - current quota usage
///
/// # Errors
///
/// - `NotFound`: Organization doesn't exist
/// - `Database`: Database error occurred
pub async fn overview(
    pool: &DbPool,
    config: &Config,
    organization_id: Uuid,
) -> Result<OverviewResponse, AppError> {
    let (today, week, month) = period_starts(Utc::now());

    let totals = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE occurred_at >= $2) AS today_count,
            COALESCE(SUM(amount_cents) FILTER (WHERE occurred_at >= $2), 0)::BIGINT AS today_amount,
            COUNT(*) FILTER (WHERE occurred_at >= $3) AS week_count,
            COALESCE(SUM(amount_cents) FILTER (WHERE occurred_at >= $3), 0)::BIGINT AS week_amount,
            COUNT(*) AS month_count,
            COALESCE(SUM(amount_cents), 0)::BIGINT AS month_amount
        FROM pix_transactions
        WHERE organization_id = $1 AND occurred_at >= $4
        "#,
    )
    .bind(organization_id)
    .bind(today)
    .bind(week)
    .bind(month)
    .fetch_one(pool)
    .await?;

    let recent = sqlx::query_as::<_, PixTransaction>(
        r#"
        SELECT * FROM pix_transactions
        WHERE organization_id = $1
        ORDER BY occurred_at DESC
        LIMIT $2
        "#,
    )
    .bind(organization_id)
    .bind(RECENT_TRANSACTIONS)
    .fetch_all(pool)
    .await?;

    let alerts_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM alerts WHERE organization_id = $1 AND created_at >= $2",
    )
    .bind(organization_id)
    .bind(today)
    .fetch_one(pool)
    .await?;

    let active_connections: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM bank_connections WHERE organization_id = $1 AND status = 'active'",
    )
    .bind(organization_id)
    .fetch_one(pool)
    .await?;

    let organization = usage_service::get_organization(pool, organization_id).await?;

    Ok(OverviewResponse {
        today: PeriodTotals {
            count: totals.today_count,
            amount_cents: totals.today_amount,
        },
        last_7_days: PeriodTotals {
            count: totals.week_count,
            amount_cents: totals.week_amount,
        },
        last_30_days: PeriodTotals {
            count: totals.month_count,
            amount_cents: totals.month_amount,
        },
        recent_transactions: recent
            .into_iter()
            .map(PixTransactionResponse::from)
            .collect(),
        alerts_today,
        active_connections,
        usage: usage_service::usage(config, &organization),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn periods_start_at_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 42, 9).unwrap();

        let (today, week, month) = period_starts(now);

        assert_eq!(today, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(week, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(month, Utc.with_ymd_and_hms(2025, 2, 8, 0, 0, 0).unwrap());
    }
}
