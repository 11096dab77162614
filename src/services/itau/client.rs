//! Itaú PIX API client.
//!
//! # Authentication
//!
//! Every call first obtains an OAuth client-credentials token with scope
//! `pix.recebimentos`, then sends it as `Authorization: Bearer` together
//! with `x-itau-apikey` and a fresh `x-itau-correlationID`.
//!
//! Production calls require the integration's PKCS#12 client certificate
//! and use a dedicated `reqwest::Client` carrying it.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::{
        bank::{BankApiIntegration, present},
        pix_transaction::NewPixTransaction,
    },
    services::itau::{
        mapper,
        models::{OAuthTokenResponse, TEST_LEITURA},
    },
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(40);
const OAUTH_SCOPE: &str = "pix.recebimentos";

/// Itaú call failures.
#[derive(Debug, thiserror::Error)]
pub enum ItauError {
    #[error("{0} not configured")]
    MissingConfiguration(&'static str),

    #[error("client certificate could not be loaded: {0}")]
    Certificate(String),

    #[error("OAuth token request failed with HTTP {status}: {body}")]
    OAuth { status: u16, body: String },

    #[error("OAuth response did not contain an access_token")]
    MissingAccessToken,

    #[error("Itaú responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Itaú response could not be decoded: {0}")]
    Decode(String),

    #[error("Itaú request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<ItauError> for AppError {
    fn from(error: ItauError) -> Self {
        match error {
            ItauError::MissingConfiguration(_) | ItauError::Certificate(_) => {
                AppError::Domain(error.to_string())
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}

/// Outcome of [`ItauClient::test_credentials`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialTest {
    pub success: bool,
    pub status_code: Option<u16>,
    pub message: String,
}

/// Format used by `data_criacao_lancamento`.
pub fn format_query_date(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Polling window with `from` moved back one hour when it is not before `to`.
pub fn normalize_window(from: DateTime<Utc>, to: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    if from >= to {
        (to - chrono::Duration::hours(1), to)
    } else {
        (from, to)
    }
}

/// Whether a `leituras_qrcodes_pix` answer proves the credentials work.
///
/// 400 and 422 mean the request reached business validation.
pub fn accepts_credentials(status: StatusCode) -> bool {
    status.is_success()
        || status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNPROCESSABLE_ENTITY
}

#[derive(Clone)]
pub struct ItauClient {
    http: reqwest::Client,
    sandbox_base_url: String,
    production_base_url: String,
    sandbox_oauth_url: String,
    production_oauth_url: String,
}

impl ItauClient {
    /// Client sharing `http` for sandbox calls, with base and OAuth URLs
    /// taken from `config`.
    ///
    /// Production calls build their own client around the integration's
    /// PKCS#12 certificate.
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            sandbox_base_url: config.itau_sandbox_base_url.clone(),
            production_base_url: config.itau_production_base_url.clone(),
            sandbox_oauth_url: config.itau_sandbox_oauth_url.clone(),
            production_oauth_url: config.itau_production_oauth_url.clone(),
        }
    }

    fn base_url<'a>(&'a self, integration: &'a BankApiIntegration, use_production: bool) -> &'a str {
        let base = present(&integration.service_url).unwrap_or(if use_production {
            self.production_base_url.as_str()
        } else {
            self.sandbox_base_url.as_str()
        });
        base.trim_end_matches('/')
    }

    /// Client for API calls: the shared one in sandbox, one carrying the
    /// client certificate in production.
    fn api_client(
        &self,
        integration: &BankApiIntegration,
        use_production: bool,
    ) -> Result<reqwest::Client, ItauError> {
        if !use_production {
            return Ok(self.http.clone());
        }

        let certificate = present(&integration.certificate_base64)
            .ok_or(ItauError::MissingConfiguration("client certificate"))?;
        let password = present(&integration.certificate_password)
            .ok_or(ItauError::MissingConfiguration("certificate password"))?;

        let der = STANDARD
            .decode(certificate)
            .map_err(|e| ItauError::Certificate(e.to_string()))?;
        let identity = reqwest::Identity::from_pkcs12_der(&der, password)
            .map_err(|e| ItauError::Certificate(e.to_string()))?;

        Ok(reqwest::Client::builder()
            .identity(identity)
            .timeout(REQUEST_TIMEOUT)
            .build()?)
    }

    /// Obtain an access token for the selected environment.
    pub async fn access_token(
        &self,
        integration: &BankApiIntegration,
        use_production: bool,
    ) -> Result<String, ItauError> {
        let (client_id, client_secret) = integration.credentials(use_production).ok_or(
            ItauError::MissingConfiguration(if use_production {
                "production client id/secret"
            } else {
                "sandbox client id/secret"
            }),
        )?;

        let token_url = if use_production {
            &self.production_oauth_url
        } else {
            &self.sandbox_oauth_url
        };

        let response = self
            .http
            .post(token_url)
            .timeout(REQUEST_TIMEOUT)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", OAUTH_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(integration_id = %integration.id, status = status.as_u16(), "Itaú OAuth request failed");
            return Err(ItauError::OAuth {
                status: status.as_u16(),
                body,
            });
        }

        let token: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| ItauError::Decode(e.to_string()))?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(ItauError::MissingAccessToken)
    }

    /// Credits booked on the integration's account between `from` and `to`.
    ///
    /// Integrations without account identifier or API key yield nothing.
    /// The environment follows `production_enabled`.
    pub async fn fetch_transactions(
        &self,
        integration: &BankApiIntegration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<NewPixTransaction>, ItauError> {
        let (Some(account), Some(api_key)) = (
            present(&integration.account_identifier),
            present(&integration.api_key),
        ) else {
            tracing::warn!(integration_id = %integration.id, "Itaú integration without account or API key, skipping");
            return Ok(Vec::new());
        };

        let (from, to) = normalize_window(from, to);
        let use_production = integration.production_enabled;

        let token = self.access_token(integration, use_production).await?;
        let client = self.api_client(integration, use_production)?;
        let url = format!("{}/lancamentos_pix", self.base_url(integration, use_production));
        let window = format!("{},{}", format_query_date(from), format_query_date(to));

        let response = client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[("id_conta", account), ("data_criacao_lancamento", window.as_str())])
            .bearer_auth(&token)
            .header("x-itau-apikey", api_key)
            .header("x-itau-correlationID", Uuid::new_v4().to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ItauError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ItauError::Decode(e.to_string()))?;

        let entries = mapper::entries_from_body(body);
        let transactions = mapper::map_credits(&entries, integration.organization_id);

        tracing::info!(
            integration_id = %integration.id,
            entries = entries.len(),
            credits = transactions.len(),
            "Fetched Itaú PIX statement"
        );

        Ok(transactions)
    }

    /// Probe the credentials with a fixed QR-code read.
    ///
    /// Configuration problems and transport errors are reported as a failed
    /// test rather than an error.
    pub async fn test_credentials(
        &self,
        integration: &BankApiIntegration,
        use_production: bool,
    ) -> CredentialTest {
        match self.probe(integration, use_production).await {
            Ok(status) if accepts_credentials(status) => CredentialTest {
                success: true,
                status_code: Some(status.as_u16()),
                message: "Credenciais aceitas pelo Itaú".to_string(),
            },
            Ok(status) => CredentialTest {
                success: false,
                status_code: Some(status.as_u16()),
                message: format!("Itaú rejected the test request with HTTP {}", status.as_u16()),
            },
            Err(e) => {
                tracing::warn!(integration_id = %integration.id, error = %e, "Itaú credential test failed");
                let status_code = match &e {
                    ItauError::OAuth { status, .. } | ItauError::Status { status, .. } => {
                        Some(*status)
                    }
                    _ => None,
                };
                CredentialTest {
                    success: false,
                    status_code,
                    message: e.to_string(),
                }
            }
        }
    }

    async fn probe(
        &self,
        integration: &BankApiIntegration,
        use_production: bool,
    ) -> Result<StatusCode, ItauError> {
        let api_key =
            present(&integration.api_key).ok_or(ItauError::MissingConfiguration("API key"))?;

        let token = self.access_token(integration, use_production).await?;
        let client = self.api_client(integration, use_production)?;
        let url = format!(
            "{}/leituras_qrcodes_pix",
            self.base_url(integration, use_production)
        );

        let response = client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&token)
            .header("x-itau-apikey", api_key)
            .header("x-itau-correlationID", Uuid::new_v4().to_string())
            .json(&TEST_LEITURA)
            .send()
            .await?;

        Ok(response.status())
    }
}
