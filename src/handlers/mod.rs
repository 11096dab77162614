//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls into the services, scoped to the caller's organization
//! 3. Returns HTTP response (JSON, status code)

/// Alert log and test alerts
pub mod alerts;
/// Organization API keys
pub mod api_keys;
/// Bank connections and Itaú integration
pub mod bank;
/// Stripe webhook
pub mod billing;
/// Dashboard overview
pub mod dashboard;
/// Service health check
pub mod health;
/// Inbound bank webhooks
pub mod integrations;
/// Quota usage
pub mod quota;
/// Notification settings
pub mod settings;
/// PIX transactions
pub mod transactions;
