//! HTTP router.
//!
//! Three groups share one state:
//! - public: health check and signed inbound webhooks
//! - member: any authenticated caller (JWT or API key)
//! - admin: JWT with the `OrgAdmin` role

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware::auth, state::AppState};

/// Build the application router.
///
/// # Access
///
/// - `/health` and the signed inbound webhooks are public
/// - every other route requires a JWT or an API key
/// - settings, bank and API key routes additionally require `OrgAdmin`
pub fn build_router(state: AppState) -> Router {
    let member_routes = Router::new()
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_transactions),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(handlers::transactions::get_transaction),
        )
        .route("/api/v1/alerts", get(handlers::alerts::list_alerts))
        .route("/api/v1/quota/usage", get(handlers::quota::get_usage))
        .route("/api/v1/app/overview", get(handlers::dashboard::overview));

    let admin_routes = Router::new()
        .route("/api/v1/alerts/test", post(handlers::alerts::send_test_alert))
        .route(
            "/api/v1/settings/notifications",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route("/api/v1/bank/connect/init", post(handlers::bank::connect_init))
        .route(
            "/api/v1/bank/connect/callback",
            post(handlers::bank::connect_callback),
        )
        .route(
            "/api/v1/bank/connections",
            get(handlers::bank::list_connections),
        )
        .route(
            "/api/v1/bank/connections/{id}/revoke",
            post(handlers::bank::revoke_connection),
        )
        .route(
            "/api/v1/bank/itau",
            get(handlers::bank::get_itau).put(handlers::bank::update_itau),
        )
        .route("/api/v1/bank/itau/test", post(handlers::bank::test_itau))
        .route(
            "/api/v1/api-keys",
            get(handlers::api_keys::list_api_keys).post(handlers::api_keys::create_api_key),
        )
        .route(
            "/api/v1/api-keys/{id}",
            axum::routing::delete(handlers::api_keys::delete_api_key),
        )
        // Runs after authentication: route_layer wraps inside-out
        .route_layer(axum_middleware::from_fn(auth::require_admin));

    let authenticated_routes = member_routes
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/webhooks/stripe",
            post(handlers::billing::stripe_webhook),
        )
        .route(
            "/api/v1/integrations/itau/webhook/{id}",
            post(handlers::integrations::itau_webhook),
        )
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
