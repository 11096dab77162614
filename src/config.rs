//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required): HS256 signing secret, at least 16 bytes
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
///
/// Everything else has a default; see the field docs.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub jwt_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// Seconds between alert dispatcher iterations.
    #[serde(default = "default_alert_interval")]
    pub alert_dispatch_interval_secs: u64,

    /// Seconds between bank polling iterations.
    #[serde(default = "default_poll_interval")]
    pub pix_poll_interval_secs: u64,

    /// Pending transactions handled per dispatcher iteration.
    #[serde(default = "default_alert_batch_size")]
    pub alert_batch_size: i64,

    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,

    /// Delivery attempts before a failed webhook alert is given up.
    #[serde(default = "default_webhook_max_attempts")]
    pub webhook_max_attempts: i32,

    #[serde(default = "default_starter_quota")]
    pub starter_monthly_quota: i64,

    #[serde(default = "default_pro_quota")]
    pub pro_monthly_quota: i64,

    pub stripe_webhook_secret: Option<String>,
    pub stripe_price_starter: Option<String>,
    pub stripe_price_pro: Option<String>,
    pub stripe_price_business: Option<String>,

    #[serde(default = "default_itau_base_url")]
    pub itau_sandbox_base_url: String,

    #[serde(default = "default_itau_base_url")]
    pub itau_production_base_url: String,

    #[serde(default = "default_itau_sandbox_oauth_url")]
    pub itau_sandbox_oauth_url: String,

    #[serde(default = "default_itau_production_oauth_url")]
    pub itau_production_oauth_url: String,

    #[serde(default = "default_consent_base_url")]
    pub open_finance_consent_base_url: String,

    /// Populate an empty database with a demo organization on startup.
    #[serde(default)]
    pub seed_demo_data: bool,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_alert_interval() -> u64 {
    20
}

fn default_poll_interval() -> u64 {
    30
}

fn default_alert_batch_size() -> i64 {
    10
}

fn default_webhook_timeout() -> u64 {
    5
}

fn default_webhook_max_attempts() -> i32 {
    5
}

fn default_starter_quota() -> i64 {
    100
}

fn default_pro_quota() -> i64 {
    1000
}

fn default_itau_base_url() -> String {
    "https://secure.api.itau/pix_recebimentos_conciliacoes/v2".to_string()
}

fn default_itau_sandbox_oauth_url() -> String {
    "https://oauthd.itau/identity/connect/token".to_string()
}

fn default_itau_production_oauth_url() -> String {
    "https://oauth.itau/identity/connect/token".to_string()
}

fn default_consent_base_url() -> String {
    "https://mock.openfinance.local".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - `JWT_SECRET` is shorter than 16 bytes
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()?.validated()
    }

    fn validated(self) -> Result<Self, envy::Error> {
        if self.jwt_secret.len() < 16 {
            return Err(envy::Error::Custom(
                "JWT_SECRET must be at least 16 bytes".to_string(),
            ));
        }
        if self.alert_batch_size <= 0 {
            return Err(envy::Error::Custom(
                "ALERT_BATCH_SIZE must be positive".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn alert_dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.alert_dispatch_interval_secs.max(1))
    }

    pub fn pix_poll_interval(&self) -> Duration {
        Duration::from_secs(self.pix_poll_interval_secs.max(1))
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs.max(1))
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    from_pairs(&[
        ("DATABASE_URL", "postgres://localhost/notificapix_test"),
        ("JWT_SECRET", "test-secret-with-enough-bytes"),
    ])
    .expect("test config")
}

#[cfg(test)]
fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
    envy::from_iter::<_, Config>(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    )?
    .validated()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let config = test_config();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.alert_dispatch_interval(), Duration::from_secs(20));
        assert_eq!(config.pix_poll_interval(), Duration::from_secs(30));
        assert_eq!(config.alert_batch_size, 10);
        assert_eq!(config.webhook_max_attempts, 5);
        assert_eq!(config.starter_monthly_quota, 100);
        assert_eq!(config.pro_monthly_quota, 1000);
        assert!(config.stripe_webhook_secret.is_none());
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let result = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("JWT_SECRET", "short"),
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn missing_database_url_is_rejected() {
        let result = from_pairs(&[("JWT_SECRET", "test-secret-with-enough-bytes")]);

        assert!(result.is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("JWT_SECRET", "test-secret-with-enough-bytes"),
            ("SERVER_PORT", "8080"),
            ("STARTER_MONTHLY_QUOTA", "30"),
            ("STRIPE_PRICE_PRO", "price_pro"),
            ("SEED_DEMO_DATA", "true"),
        ])
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.starter_monthly_quota, 30);
        assert_eq!(config.stripe_price_pro.as_deref(), Some("price_pro"));
        assert!(config.seed_demo_data);
    }
}
