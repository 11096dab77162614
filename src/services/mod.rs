//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and outbound calls; the
//! background workers reuse them as well.

/// Alert fan-out, persistence and webhook retries
pub mod alert_service;
/// Stripe subscription webhooks
pub mod billing_service;
/// Dashboard aggregates
pub mod dashboard_service;
/// Outbound email
pub mod email;
/// PIX transaction dedup-and-upsert
pub mod ingestion;
/// Itaú bank API integration
pub mod itau;
/// Mock Open Finance provider
pub mod open_finance;
/// Demo data seeding
pub mod seed;
/// Notification settings
pub mod settings_service;
/// HMAC-SHA256 signatures
pub mod signer;
/// PIX transaction queries
pub mod transaction_service;
/// Plan quotas and monthly usage
pub mod usage_service;
/// Signed webhook delivery and URL validation
pub mod webhook_service;
