//! Per-organization alert recipients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a notification settings record from the database.
///
/// # Database Table
///
/// Maps to the `notification_settings` table, one row per organization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationSettings {
    pub id: Uuid,
    pub organization_id: Uuid,

    /// Addresses that receive one email per transaction.
    pub emails: Vec<String>,

    pub webhook_url: Option<String>,

    /// HMAC key for `X-NotificaPix-Signature`.
    pub webhook_secret: Option<String>,

    /// Master switch; disabled settings skip every channel.
    pub enabled: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationSettings {
    /// Webhook target when both URL and secret are configured.
    pub fn webhook_target(&self) -> Option<(&str, &str)> {
        let url = self.webhook_url.as_deref().filter(|u| !u.trim().is_empty())?;
        let secret = self
            .webhook_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())?;
        Some((url, secret))
    }
}

/// Longest deliverable address (RFC 5321 path limit).
pub const MAX_EMAIL_CHARS: usize = 254;

/// Request body for `PUT /api/v1/settings/notifications`.
///
/// # Validation
///
/// - every email must look like `local@domain.tld` and fit in 254 characters;
///   duplicates are dropped
/// - `webhook_url` must pass the webhook URL rules (https, or http on localhost)
/// - a `webhook_secret` is required whenever `webhook_url` is set
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettingsRequest {
    #[serde(default)]
    pub emails: Vec<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl NotificationSettingsRequest {
    /// Trimmed, lowercased and de-duplicated recipient list.
    ///
    /// Fails with the first address that is not a plausible email.
    pub fn normalized_emails(&self) -> Result<Vec<String>, String> {
        let mut emails: Vec<String> = Vec::with_capacity(self.emails.len());
        for raw in &self.emails {
            let email = raw.trim().to_lowercase();
            if email.is_empty() {
                continue;
            }
            if email.chars().count() > MAX_EMAIL_CHARS {
                return Err(format!("email address exceeds {MAX_EMAIL_CHARS} characters"));
            }
            if !is_valid_email(&email) {
                return Err(format!("invalid email address: {}", raw.trim()));
            }
            if !emails.contains(&email) {
                emails.push(email);
            }
        }
        Ok(emails)
    }

    /// Blank URL and secret are treated as absent.
    pub fn webhook(&self) -> (Option<String>, Option<String>) {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        (clean(&self.webhook_url), clean(&self.webhook_secret))
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Response body for the notification settings endpoints.
///
/// The webhook secret is never echoed back.
#[derive(Debug, Serialize)]
pub struct NotificationSettingsResponse {
    pub emails: Vec<String>,
    pub webhook_url: Option<String>,
    pub has_webhook_secret: bool,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<NotificationSettings> for NotificationSettingsResponse {
    fn from(settings: NotificationSettings) -> Self {
        Self {
            has_webhook_secret: settings
                .webhook_secret
                .as_deref()
                .is_some_and(|s| !s.is_empty()),
            emails: settings.emails,
            webhook_url: settings.webhook_url,
            enabled: settings.enabled,
            updated_at: settings.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(emails: &[&str]) -> NotificationSettingsRequest {
        NotificationSettingsRequest {
            emails: emails.iter().map(|e| e.to_string()).collect(),
            webhook_url: None,
            webhook_secret: None,
            enabled: true,
        }
    }

    #[test]
    fn emails_are_normalized_and_deduplicated() {
        let emails = request(&[" Alerts@Demo.com ", "alerts@demo.com", "", "ops@demo.com.br"])
            .normalized_emails()
            .unwrap();

        assert_eq!(emails, vec!["alerts@demo.com", "ops@demo.com.br"]);
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["plainaddress", "@demo.com", "ana@", "ana@demo", "a b@demo.com", "a@b@c.com"] {
            assert!(
                request(&[bad]).normalized_emails().is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn overlong_emails_are_rejected() {
        let local = "a".repeat(MAX_EMAIL_CHARS);
        let too_long = format!("{local}@demo.com");
        let fits = format!("{}@demo.com", "a".repeat(MAX_EMAIL_CHARS - 9));

        assert!(request(&[too_long.as_str()]).normalized_emails().is_err());
        assert_eq!(
            request(&[fits.as_str()]).normalized_emails().unwrap(),
            vec![fits.clone()]
        );
    }

    #[test]
    fn blank_webhook_fields_count_as_missing() {
        let req = NotificationSettingsRequest {
            webhook_url: Some("  ".to_string()),
            webhook_secret: Some(String::new()),
            ..request(&[])
        };

        assert_eq!(req.webhook(), (None, None));
    }

    #[test]
    fn webhook_target_requires_url_and_secret() {
        let now = Utc::now();
        let mut settings = NotificationSettings {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            emails: vec![],
            webhook_url: Some("https://hooks.example.com/pix".to_string()),
            webhook_secret: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        assert!(settings.webhook_target().is_none());

        settings.webhook_secret = Some("secret123".to_string());
        assert_eq!(
            settings.webhook_target(),
            Some(("https://hooks.example.com/pix", "secret123"))
        );
    }
}
