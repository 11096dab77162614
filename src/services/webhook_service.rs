//! Webhook service for validating endpoints and delivering signed alerts.
//!
//! Delivery goes through the [`WebhookSender`] trait so the alert pipeline
//! can be exercised without network access.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::AppError, services::signer};

pub const SIGNATURE_HEADER: &str = "X-NotificaPix-Signature";
pub const EVENT_ID_HEADER: &str = "X-NotificaPix-Event-Id";

/// Why a webhook delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Receiver answered with a non-2xx status.
    #[error("webhook responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS or timeout failure.
    #[error("webhook request failed: {0}")]
    Transport(String),
}

/// Outbound webhook transport.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// POST `body` to `url`, signed with `secret`.
    async fn send(
        &self,
        url: &str,
        secret: &str,
        event_id: Uuid,
        body: &[u8],
    ) -> Result<(), DeliveryError>;
}

/// [`WebhookSender`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpWebhookSender {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpWebhookSender {
    /// `timeout` bounds each delivery, connection included.
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// Longest response body kept in an alert's error message.
const MAX_ERROR_BODY: usize = 500;

#[async_trait]
impl WebhookSender for HttpWebhookSender {
    /// Send a single webhook with HMAC signature.
    ///
    /// # Headers Sent
    ///
    /// - `Content-Type: application/json`
    /// - `X-NotificaPix-Signature: sha256=<hex>`
    /// - `X-NotificaPix-Event-Id: <uuid>`
    ///
    /// # Timeout
    ///
    /// `WEBHOOK_TIMEOUT_SECS` per request (5 seconds by default)
    async fn send(
        &self,
        url: &str,
        secret: &str,
        event_id: Uuid,
        body: &[u8],
    ) -> Result<(), DeliveryError> {
        let signature = signer::sign(secret, body);

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(EVENT_ID_HEADER, event_id.to_string())
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }

        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Validate webhook URL format.
///
/// # Rules
///
/// - Must be valid URL
/// - Must be HTTPS (HTTP localhost allowed for development)
/// - Maximum 2048 characters
pub fn validate_webhook_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::InvalidWebhookUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidWebhookUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            if matches!(
                parsed.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0")
            ) {
                Ok(())
            } else {
                Err(AppError::InvalidWebhookUrl(
                    "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
                ))
            }
        }
        _ => Err(AppError::InvalidWebhookUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}
