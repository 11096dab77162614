//! Outbound HTTP against a local mock server: signed alert webhooks and
//! the Itaú PIX API.

use chrono::{Duration, Utc};
use httpmock::prelude::*;
use notificapix::{
    config::Config,
    models::bank::{BANK_ITAU, BankApiIntegration},
    services::{
        itau::client::ItauClient,
        signer,
        webhook_service::{DeliveryError, HttpWebhookSender, WebhookSender},
    },
};
use serde_json::json;
use uuid::Uuid;

fn config(oauth_url: &str) -> Config {
    envy::from_iter(vec![
        ("DATABASE_URL".to_string(), "postgres://localhost/notificapix_test".to_string()),
        ("JWT_SECRET".to_string(), "integration-test-secret-0123456789".to_string()),
        ("ITAU_SANDBOX_OAUTH_URL".to_string(), oauth_url.to_string()),
    ])
    .expect("test config")
}

fn integration(service_url: String) -> BankApiIntegration {
    let now = Utc::now();
    BankApiIntegration {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        bank: BANK_ITAU.to_string(),
        sandbox_client_id: Some("client-id".to_string()),
        sandbox_client_secret: Some("client-secret".to_string()),
        production_client_id: None,
        production_client_secret: None,
        certificate_file_name: None,
        certificate_password: None,
        certificate_base64: None,
        production_enabled: false,
        is_tested: false,
        last_tested_at: None,
        service_url: Some(service_url),
        api_key: Some("api-key-1".to_string()),
        account_identifier: Some("account-42".to_string()),
        webhook_secret: None,
        last_polled_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn sender() -> HttpWebhookSender {
    HttpWebhookSender::new(reqwest::Client::new(), std::time::Duration::from_secs(5))
}

#[tokio::test]
async fn webhook_is_signed_and_carries_event_id() {
    let server = MockServer::start_async().await;
    let event_id = Uuid::new_v4();
    let body = br#"{"event_type":"pix.received"}"#;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hook")
                .header("content-type", "application/json")
                .header("x-notificapix-signature", signer::sign("s3cr3t", body))
                .header("x-notificapix-event-id", event_id.to_string());
            then.status(204);
        })
        .await;

    let result = sender()
        .send(&server.url("/hook"), "s3cr3t", event_id, body)
        .await;

    mock.assert_async().await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn non_success_status_is_a_delivery_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/hook");
            then.status(500).body("receiver down");
        })
        .await;

    let result = sender()
        .send(&server.url("/hook"), "s3cr3t", Uuid::new_v4(), b"{}")
        .await;

    assert_eq!(
        result,
        Err(DeliveryError::Status {
            status: 500,
            body: "receiver down".to_string(),
        })
    );
}

#[tokio::test]
async fn unreachable_receiver_is_a_transport_error() {
    let result = sender()
        .send("http://127.0.0.1:9/hook", "s3cr3t", Uuid::new_v4(), b"{}")
        .await;

    assert!(matches!(result, Err(DeliveryError::Transport(_))));
}

#[tokio::test]
async fn statement_credits_are_fetched_and_normalized() {
    let server = MockServer::start_async().await;

    let oauth = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_includes("grant_type=client_credentials")
                .body_includes("scope=pix.recebimentos");
            then.status(200)
                .json_body(json!({ "access_token": "token-1", "expires_in": 300 }));
        })
        .await;

    let statement = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/lancamentos_pix")
                .query_param("id_conta", "account-42")
                .header("authorization", "Bearer token-1")
                .header("x-itau-apikey", "api-key-1")
                .header_exists("x-itau-correlationid");
            then.status(200).json_body(json!({
                "data": [
                    {
                        "tipo_operacao": "credito",
                        "literal_lancamento": "PIX RECEBIDO",
                        "detalhe_pagamento": {
                            "txid": "tx-1",
                            "id_transferencia": "E60701190202506011200abc",
                            "valor": "150.75",
                            "data": "2025-06-01T12:00:00Z",
                            "debitado": { "nome": "Maria Lima", "numero_documento": "12345678900" }
                        }
                    },
                    {
                        "tipo_operacao": "debito",
                        "detalhe_pagamento": { "valor": "10.00" }
                    }
                ]
            }));
        })
        .await;

    let client = ItauClient::new(reqwest::Client::new(), &config(&server.url("/oauth/token")));
    let integration = integration(server.base_url());
    let to = Utc::now();

    let transactions = client
        .fetch_transactions(&integration, to - Duration::hours(1), to)
        .await
        .expect("fetch");

    oauth.assert_async().await;
    statement.assert_async().await;

    assert_eq!(transactions.len(), 1);
    let credit = &transactions[0];
    assert_eq!(credit.organization_id, integration.organization_id);
    assert_eq!(credit.tx_id, "tx-1");
    assert_eq!(credit.end_to_end_id, "E60701190202506011200abc");
    assert_eq!(credit.amount_cents, 15075);
    assert_eq!(credit.payer_name, "Maria Lima");
    assert_eq!(credit.payer_key, "12345678900");
    assert_eq!(credit.description, "PIX RECEBIDO");
}

#[tokio::test]
async fn integration_without_account_is_not_called() {
    let server = MockServer::start_async().await;
    let client = ItauClient::new(reqwest::Client::new(), &config(&server.url("/oauth/token")));

    let mut integration = integration(server.base_url());
    integration.account_identifier = Some("  ".to_string());
    let to = Utc::now();

    let transactions = client
        .fetch_transactions(&integration, to - Duration::hours(1), to)
        .await
        .expect("fetch");

    assert!(transactions.is_empty());
}

#[tokio::test]
async fn validation_error_on_probe_means_credentials_work() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200).json_body(json!({ "access_token": "token-1" }));
        })
        .await;
    let probe = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/leituras_qrcodes_pix")
                .header("authorization", "Bearer token-1")
                .body_includes("E08561701202208271525CGPXCDAPPNO");
            then.status(422).json_body(json!({ "mensagem": "QR code invalido" }));
        })
        .await;

    let client = ItauClient::new(reqwest::Client::new(), &config(&server.url("/oauth/token")));
    let outcome = client
        .test_credentials(&integration(server.base_url()), false)
        .await;

    probe.assert_async().await;
    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(422));
}

#[tokio::test]
async fn rejected_oauth_fails_the_credential_test() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(401).body("invalid_client");
        })
        .await;

    let client = ItauClient::new(reqwest::Client::new(), &config(&server.url("/oauth/token")));
    let outcome = client
        .test_credentials(&integration(server.base_url()), false)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.status_code, Some(401));
}
