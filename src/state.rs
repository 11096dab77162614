//! Shared application state.

use std::sync::Arc;

use crate::{
    config::Config,
    db::DbPool,
    middleware::auth::JwtKeys,
    services::{
        alert_service::Notifiers, email::LogEmailSender, itau::client::ItauClient,
        open_finance::MockOpenFinanceProvider, webhook_service::HttpWebhookSender,
    },
};

/// State shared by every handler and both background workers.
///
/// Cloning is cheap: the pool, the HTTP client and the senders are all
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub jwt: JwtKeys,
    pub notifiers: Notifiers,
    pub itau: ItauClient,
    pub open_finance: MockOpenFinanceProvider,
}

impl AppState {
    /// Wire the production implementations around a pool and a config.
    pub fn new(pool: DbPool, config: Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("notificapix/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            jwt: JwtKeys::new(&config.jwt_secret),
            notifiers: Notifiers {
                email: Arc::new(LogEmailSender),
                webhook: Arc::new(HttpWebhookSender::new(
                    http.clone(),
                    config.webhook_timeout(),
                )),
            },
            itau: ItauClient::new(http, &config),
            open_finance: MockOpenFinanceProvider::new(
                config.open_finance_consent_base_url.clone(),
            ),
            config: Arc::new(config),
            pool,
        })
    }
}
