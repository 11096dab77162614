//! Router-level authentication and role checks.
//!
//! The pool is connected lazily and none of these requests reach the
//! database, so no PostgreSQL server is needed.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use notificapix::{
    config::Config,
    db,
    middleware::auth::{JwtKeys, Role},
    routes::build_router,
    state::AppState,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const JWT_SECRET: &str = "integration-test-secret-0123456789";

fn config(extra: &[(&str, &str)]) -> Config {
    let mut vars = vec![
        ("DATABASE_URL".to_string(), "postgres://localhost/notificapix_test".to_string()),
        ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
    ];
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    envy::from_iter(vars).expect("test config")
}

fn app_with(config: Config) -> Router {
    let pool = db::create_lazy_pool(&config.database_url, 1).expect("lazy pool");
    build_router(AppState::new(pool, config).expect("state"))
}

fn app() -> Router {
    app_with(config(&[]))
}

fn token(role: Role) -> String {
    JwtKeys::new(JWT_SECRET)
        .issue(Uuid::new_v4(), Uuid::new_v4(), role)
        .expect("token")
}

async fn error_code(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = app()
        .oneshot(
            Request::get("/api/v1/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "unauthorized");
}

#[tokio::test]
async fn invalid_jwt_is_unauthorized() {
    let response = app()
        .oneshot(
            Request::get("/api/v1/alerts")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_other_secret_is_unauthorized() {
    let forged = JwtKeys::new("some-other-secret-0123456789")
        .issue(Uuid::new_v4(), Uuid::new_v4(), Role::OrgAdmin)
        .unwrap();

    let response = app()
        .oneshot(
            Request::get("/api/v1/settings/notifications")
                .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn members_cannot_use_admin_routes() {
    let member = token(Role::OrgMember);

    for (method, uri) in [
        ("GET", "/api/v1/settings/notifications"),
        ("POST", "/api/v1/alerts/test"),
        ("GET", "/api/v1/bank/itau"),
        ("GET", "/api/v1/api-keys"),
        ("POST", "/api/v1/bank/connect/init"),
    ] {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {member}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(error_code(response).await, "forbidden");
    }
}

#[tokio::test]
async fn admin_reaches_handlers_that_need_no_database() {
    let admin = token(Role::OrgAdmin);

    let response = app()
        .oneshot(
            Request::post("/api/v1/bank/connect/init")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(
        body["consent_url"]
            .as_str()
            .unwrap()
            .contains("/consent?org=")
    );
}

#[tokio::test]
async fn stripe_webhook_with_bad_signature_is_rejected() {
    let app = app_with(config(&[("STRIPE_WEBHOOK_SECRET", "whsec_test")]));

    let response = app
        .oneshot(
            Request::post("/api/v1/webhooks/stripe")
                .header("Stripe-Signature", "t=1,v1=deadbeef")
                .body(Body::from(r#"{"id":"evt_1","type":"customer.subscription.updated"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let response = app()
        .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
