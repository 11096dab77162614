//! Bank connection models.
//!
//! Two kinds of bank sources feed transactions:
//! - `BankConnection`: a consent-based Open Finance connection (mocked provider)
//! - `BankApiIntegration`: direct credentials for a bank's PIX API (Itaú)
//!
//! Inbound bank webhooks are recorded as `BankWebhookEvent` for replay protection.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::string_enum;

/// `bank` column value for Itaú integrations.
pub const BANK_ITAU: &str = "itau";

string_enum! {
    BankProvider {
        Mock => "mock",
    }
}

string_enum! {
    BankConnectionStatus {
        Pending => "pending",
        Active => "active",
        Revoked => "revoked",
    }
}

/// Represents an Open Finance connection record from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankConnection {
    pub id: Uuid,
    pub organization_id: Uuid,

    #[sqlx(try_from = "String")]
    pub provider: BankProvider,

    pub consent_id: String,

    #[sqlx(try_from = "String")]
    pub status: BankConnectionStatus,

    pub connected_at: Option<DateTime<Utc>>,
    pub meta_json: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BankConnectionResponse {
    pub id: Uuid,
    pub provider: BankProvider,
    pub consent_id: String,
    pub status: BankConnectionStatus,
    pub connected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<BankConnection> for BankConnectionResponse {
    fn from(connection: BankConnection) -> Self {
        Self {
            id: connection.id,
            provider: connection.provider,
            consent_id: connection.consent_id,
            status: connection.status,
            connected_at: connection.connected_at,
            created_at: connection.created_at,
        }
    }
}

/// Response body for `POST /api/v1/bank/connect/init`.
#[derive(Debug, Serialize)]
pub struct ConnectInitResponse {
    pub consent_url: String,
}

/// Request body for `POST /api/v1/bank/connect/callback`.
#[derive(Debug, Deserialize)]
pub struct ConnectCallbackRequest {
    pub consent_id: String,
}

/// Represents a direct bank API integration record from the database.
///
/// # Secrets
///
/// Client secrets, certificate material and the webhook secret are stored
/// as given and never returned by the API; see [`ItauIntegrationResponse`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankApiIntegration {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub bank: String,

    pub sandbox_client_id: Option<String>,
    pub sandbox_client_secret: Option<String>,
    pub production_client_id: Option<String>,
    pub production_client_secret: Option<String>,

    pub certificate_file_name: Option<String>,
    pub certificate_password: Option<String>,

    /// PKCS#12 client certificate, base64 encoded. Required in production.
    pub certificate_base64: Option<String>,

    pub production_enabled: bool,
    pub is_tested: bool,
    pub last_tested_at: Option<DateTime<Utc>>,

    /// Overrides the configured API base URL.
    pub service_url: Option<String>,

    /// Sent as `x-itau-apikey`.
    pub api_key: Option<String>,

    /// Account queried by the PIX statement endpoint (`id_conta`).
    pub account_identifier: Option<String>,

    /// HMAC key for `X-Itau-Signature` on inbound webhooks.
    pub webhook_secret: Option<String>,

    pub last_polled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Non-blank value of an optional column.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl BankApiIntegration {
    /// Polling needs both the account and the API key.
    pub fn can_poll(&self) -> bool {
        present(&self.account_identifier).is_some() && present(&self.api_key).is_some()
    }

    /// Client id and secret for the selected environment.
    pub fn credentials(&self, use_production: bool) -> Option<(&str, &str)> {
        if use_production {
            Some((
                present(&self.production_client_id)?,
                present(&self.production_client_secret)?,
            ))
        } else {
            Some((
                present(&self.sandbox_client_id)?,
                present(&self.sandbox_client_secret)?,
            ))
        }
    }
}

/// Request body for `PUT /api/v1/bank/itau`.
///
/// Omitted fields keep their stored value; an empty string clears it.
/// Saving always clears `is_tested`, so changed credentials are re-tested.
#[derive(Debug, Default, Deserialize)]
pub struct ItauIntegrationRequest {
    pub sandbox_client_id: Option<String>,
    pub sandbox_client_secret: Option<String>,
    pub production_client_id: Option<String>,
    pub production_client_secret: Option<String>,
    pub certificate_file_name: Option<String>,
    pub certificate_password: Option<String>,
    pub certificate_base64: Option<String>,
    pub production_enabled: Option<bool>,
    pub service_url: Option<String>,
    pub api_key: Option<String>,
    pub account_identifier: Option<String>,
    pub webhook_secret: Option<String>,
}

/// Column values written by the Itaú integration upsert.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ItauIntegrationValues {
    pub sandbox_client_id: Option<String>,
    pub sandbox_client_secret: Option<String>,
    pub production_client_id: Option<String>,
    pub production_client_secret: Option<String>,
    pub certificate_file_name: Option<String>,
    pub certificate_password: Option<String>,
    pub certificate_base64: Option<String>,
    pub production_enabled: bool,
    pub service_url: Option<String>,
    pub api_key: Option<String>,
    pub account_identifier: Option<String>,
    pub webhook_secret: Option<String>,
}

fn merge_field(update: Option<String>, stored: Option<String>) -> Option<String> {
    match update {
        Some(value) => {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        None => stored,
    }
}

impl ItauIntegrationRequest {
    /// Merge the request over the stored integration, if any.
    ///
    /// # Errors
    ///
    /// Returns a message when the certificate is not valid base64, the
    /// service URL is not http(s), or production is enabled without
    /// production credentials and a certificate.
    pub fn merge(self, stored: Option<BankApiIntegration>) -> Result<ItauIntegrationValues, String> {
        let stored_values = stored
            .map(|s| ItauIntegrationValues {
                sandbox_client_id: s.sandbox_client_id,
                sandbox_client_secret: s.sandbox_client_secret,
                production_client_id: s.production_client_id,
                production_client_secret: s.production_client_secret,
                certificate_file_name: s.certificate_file_name,
                certificate_password: s.certificate_password,
                certificate_base64: s.certificate_base64,
                production_enabled: s.production_enabled,
                service_url: s.service_url,
                api_key: s.api_key,
                account_identifier: s.account_identifier,
                webhook_secret: s.webhook_secret,
            })
            .unwrap_or_default();

        let values = ItauIntegrationValues {
            sandbox_client_id: merge_field(self.sandbox_client_id, stored_values.sandbox_client_id),
            sandbox_client_secret: merge_field(
                self.sandbox_client_secret,
                stored_values.sandbox_client_secret,
            ),
            production_client_id: merge_field(
                self.production_client_id,
                stored_values.production_client_id,
            ),
            production_client_secret: merge_field(
                self.production_client_secret,
                stored_values.production_client_secret,
            ),
            certificate_file_name: merge_field(
                self.certificate_file_name,
                stored_values.certificate_file_name,
            ),
            certificate_password: merge_field(
                self.certificate_password,
                stored_values.certificate_password,
            ),
            certificate_base64: merge_field(
                self.certificate_base64,
                stored_values.certificate_base64,
            ),
            production_enabled: self
                .production_enabled
                .unwrap_or(stored_values.production_enabled),
            service_url: merge_field(self.service_url, stored_values.service_url),
            api_key: merge_field(self.api_key, stored_values.api_key),
            account_identifier: merge_field(
                self.account_identifier,
                stored_values.account_identifier,
            ),
            webhook_secret: merge_field(self.webhook_secret, stored_values.webhook_secret),
        };

        if let Some(certificate) = &values.certificate_base64 {
            STANDARD
                .decode(certificate)
                .map_err(|_| "certificate_base64 is not valid base64".to_string())?;
        }

        if let Some(service_url) = &values.service_url {
            let parsed = url::Url::parse(service_url)
                .map_err(|_| "service_url is not a valid URL".to_string())?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err("service_url must use HTTP or HTTPS".to_string());
            }
        }

        if values.production_enabled
            && (values.production_client_id.is_none()
                || values.production_client_secret.is_none()
                || values.certificate_base64.is_none())
        {
            return Err(
                "production requires client id, client secret and a client certificate"
                    .to_string(),
            );
        }

        Ok(values)
    }
}

/// Itaú integration as shown to admins. Secrets are reported as present or not.
#[derive(Debug, Serialize)]
pub struct ItauIntegrationResponse {
    pub id: Uuid,
    pub sandbox_client_id: Option<String>,
    pub has_sandbox_client_secret: bool,
    pub production_client_id: Option<String>,
    pub has_production_client_secret: bool,
    pub certificate_file_name: Option<String>,
    pub has_certificate: bool,
    pub production_enabled: bool,
    pub is_tested: bool,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub service_url: Option<String>,
    pub has_api_key: bool,
    pub account_identifier: Option<String>,
    pub has_webhook_secret: bool,

    /// Path the bank should deliver webhooks to.
    pub webhook_path: String,

    pub last_polled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<BankApiIntegration> for ItauIntegrationResponse {
    fn from(integration: BankApiIntegration) -> Self {
        Self {
            has_sandbox_client_secret: present(&integration.sandbox_client_secret).is_some(),
            has_production_client_secret: present(&integration.production_client_secret).is_some(),
            has_certificate: present(&integration.certificate_base64).is_some(),
            has_api_key: present(&integration.api_key).is_some(),
            has_webhook_secret: present(&integration.webhook_secret).is_some(),
            webhook_path: format!("/api/v1/integrations/itau/webhook/{}", integration.id),
            id: integration.id,
            sandbox_client_id: integration.sandbox_client_id,
            production_client_id: integration.production_client_id,
            certificate_file_name: integration.certificate_file_name,
            production_enabled: integration.production_enabled,
            is_tested: integration.is_tested,
            last_tested_at: integration.last_tested_at,
            service_url: integration.service_url,
            account_identifier: integration.account_identifier,
            last_polled_at: integration.last_polled_at,
            updated_at: integration.updated_at,
        }
    }
}

/// Request body for `POST /api/v1/bank/itau/test`.
#[derive(Debug, Default, Deserialize)]
pub struct ItauTestRequest {
    #[serde(default)]
    pub use_production: bool,
}

/// Outcome of a credential test.
#[derive(Debug, Serialize)]
pub struct ItauTestResponse {
    pub success: bool,
    pub status_code: Option<u16>,
    pub message: String,
    pub tested_at: DateTime<Utc>,
}

/// Inbound bank webhook delivery, kept for replay protection and audit.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankWebhookEvent {
    pub id: Uuid,
    pub bank_api_integration_id: Uuid,
    pub organization_id: Uuid,
    pub bank: String,
    pub event_id: String,
    pub event_type: String,
    pub signature: String,
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> BankApiIntegration {
        let now = Utc::now();
        BankApiIntegration {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            bank: BANK_ITAU.to_string(),
            sandbox_client_id: Some("sandbox-id".to_string()),
            sandbox_client_secret: Some("sandbox-secret".to_string()),
            production_client_id: None,
            production_client_secret: None,
            certificate_file_name: None,
            certificate_password: None,
            certificate_base64: None,
            production_enabled: false,
            is_tested: true,
            last_tested_at: Some(now),
            service_url: None,
            api_key: Some("api-key".to_string()),
            account_identifier: Some("1234-5".to_string()),
            webhook_secret: Some("whsec".to_string()),
            last_polled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn omitted_fields_keep_stored_values_and_empty_clears() {
        let request = ItauIntegrationRequest {
            sandbox_client_id: Some(" new-id ".to_string()),
            api_key: Some(String::new()),
            ..Default::default()
        };

        let values = request.merge(Some(stored())).unwrap();

        assert_eq!(values.sandbox_client_id.as_deref(), Some("new-id"));
        assert_eq!(values.sandbox_client_secret.as_deref(), Some("sandbox-secret"));
        assert_eq!(values.api_key, None);
        assert_eq!(values.webhook_secret.as_deref(), Some("whsec"));
    }

    #[test]
    fn production_requires_credentials_and_certificate() {
        let request = ItauIntegrationRequest {
            production_enabled: Some(true),
            production_client_id: Some("prod-id".to_string()),
            production_client_secret: Some("prod-secret".to_string()),
            ..Default::default()
        };
        assert!(request.merge(Some(stored())).is_err());

        let request = ItauIntegrationRequest {
            production_enabled: Some(true),
            production_client_id: Some("prod-id".to_string()),
            production_client_secret: Some("prod-secret".to_string()),
            certificate_base64: Some(STANDARD.encode(b"pkcs12-bytes")),
            ..Default::default()
        };
        assert!(request.merge(Some(stored())).unwrap().production_enabled);
    }

    #[test]
    fn certificate_must_be_base64() {
        let request = ItauIntegrationRequest {
            certificate_base64: Some("not base64!".to_string()),
            ..Default::default()
        };

        assert!(request.merge(None).is_err());
    }

    #[test]
    fn response_hides_secrets() {
        let response = ItauIntegrationResponse::from(stored());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["has_sandbox_client_secret"], true);
        assert_eq!(json["has_webhook_secret"], true);
        assert!(json.get("sandbox_client_secret").is_none());
        assert!(json.get("webhook_secret").is_none());
        assert!(json.get("api_key").is_none());
    }

    #[test]
    fn polling_and_credentials_need_non_blank_values() {
        let mut integration = stored();
        assert!(integration.can_poll());
        assert_eq!(
            integration.credentials(false),
            Some(("sandbox-id", "sandbox-secret"))
        );
        assert_eq!(integration.credentials(true), None);

        integration.api_key = Some("  ".to_string());
        assert!(!integration.can_poll());
    }
}
