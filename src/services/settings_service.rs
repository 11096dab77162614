//! Notification settings of an organization.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::notification_settings::{
        NotificationSettings, NotificationSettingsRequest, NotificationSettingsResponse,
    },
    services::{alert_service, webhook_service::validate_webhook_url},
};

/// Webhook URL and secret to store.
///
/// The secret is never echoed to clients, so an omitted secret keeps the
/// stored one. Removing the URL removes the secret as well.
pub fn resolve_webhook(
    url: Option<String>,
    secret: Option<String>,
    stored_secret: Option<String>,
) -> Result<(Option<String>, Option<String>), AppError> {
    let Some(url) = url else {
        return Ok((None, None));
    };

    validate_webhook_url(&url)?;

    let secret = secret
        .or(stored_secret.filter(|s| !s.trim().is_empty()))
        .ok_or_else(|| {
            AppError::InvalidRequest("webhook_secret is required when webhook_url is set".to_string())
        })?;

    Ok((Some(url), Some(secret)))
}

/// # Errors
///
/// - `NotFound`: Settings were never saved for the organization
pub async fn get_settings(
    pool: &DbPool,
    organization_id: Uuid,
) -> Result<NotificationSettingsResponse, AppError> {
    alert_service::get_settings(pool, organization_id)
        .await?
        .map(NotificationSettingsResponse::from)
        .ok_or(AppError::NotFound("Notification settings"))
}

/// Create or replace the organization's notification settings.
///
/// # Errors
///
/// - `InvalidRequest`: Invalid email, or webhook URL without a secret
/// - `InvalidWebhookUrl`: URL is not https (or http on localhost)
pub async fn save_settings(
    pool: &DbPool,
    organization_id: Uuid,
    request: NotificationSettingsRequest,
) -> Result<NotificationSettingsResponse, AppError> {
    let emails = request
        .normalized_emails()
        .map_err(AppError::InvalidRequest)?;
    let (url, secret) = request.webhook();

    let stored = alert_service::get_settings(pool, organization_id).await?;
    let (webhook_url, webhook_secret) =
        resolve_webhook(url, secret, stored.and_then(|s| s.webhook_secret))?;

    let settings = sqlx::query_as::<_, NotificationSettings>(
        r#"
        INSERT INTO notification_settings (organization_id, emails, webhook_url, webhook_secret, enabled)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (organization_id) DO UPDATE
        SET emails = EXCLUDED.emails,
            webhook_url = EXCLUDED.webhook_url,
            webhook_secret = EXCLUDED.webhook_secret,
            enabled = EXCLUDED.enabled,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(organization_id)
    .bind(&emails)
    .bind(webhook_url)
    .bind(webhook_secret)
    .bind(request.enabled)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        organization_id = %organization_id,
        emails = settings.emails.len(),
        webhook = settings.webhook_url.is_some(),
        enabled = settings.enabled,
        "Notification settings saved"
    );

    Ok(settings.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn url_requires_a_secret() {
        let result = resolve_webhook(some("https://hooks.example.com/pix"), None, None);

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn omitted_secret_keeps_stored_one() {
        let (url, secret) =
            resolve_webhook(some("https://hooks.example.com/pix"), None, some("kept")).unwrap();

        assert_eq!(url.as_deref(), Some("https://hooks.example.com/pix"));
        assert_eq!(secret.as_deref(), Some("kept"));
    }

    #[test]
    fn new_secret_replaces_stored_one() {
        let (_, secret) = resolve_webhook(
            some("https://hooks.example.com/pix"),
            some("fresh"),
            some("kept"),
        )
        .unwrap();

        assert_eq!(secret.as_deref(), Some("fresh"));
    }

    #[test]
    fn removing_url_drops_secret() {
        assert_eq!(resolve_webhook(None, some("s"), some("kept")).unwrap(), (None, None));
    }

    #[test]
    fn plain_http_outside_localhost_is_rejected() {
        let result = resolve_webhook(some("http://hooks.example.com/pix"), some("s"), None);

        assert!(matches!(result, Err(AppError::InvalidWebhookUrl(_))));
    }
}
