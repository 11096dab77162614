//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Short-circuit requests (reject unauthorized or forbidden)

/// Bearer (JWT or API key) authentication and role gate
pub mod auth;
