//! NotificaPix - PIX payment notifications for organizations.
//!
//! Incoming PIX credits are collected from bank integrations (a mock Open
//! Finance provider and the Itaú PIX API, polled or pushed by webhook),
//! deduplicated per organization, and announced by email and signed
//! webhooks within each plan's monthly quota.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: HS256 JWT or SHA-256 hashed API key
//! - **Background work**: alert dispatcher and PIX polling tokio tasks

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod workers;
