//! Integration tests for authentication and credential retrieval/storage
//! against a mock vault.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keyturn::{
    AuthenticationService, CredentialStore, ErrorKind, RetryPolicy, VaultConfig, VaultError,
};

fn config_for(server: &MockServer) -> VaultConfig {
    VaultConfig::new(server.uri(), "acct", "svc")
}

/// Mount the two-step login/authenticate flow on the mock vault.
async fn mount_auth(server: &MockServer, raw_token: &str) {
    // Basic auth for ("svc", "") is base64("svc:").
    Mock::given(method("GET"))
        .and(path("/authn/acct/login"))
        .and(header("Authorization", "Basic c3ZjOg=="))
        .respond_with(ResponseTemplate::new(200).set_body_string("api-key-123"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/authn/acct/svc/authenticate"))
        .and(body_string("api-key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(raw_token.to_string()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn authenticate_without_cert_uses_login_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/authn/acct/login"))
        .and(header("Authorization", "Basic c3ZjOg=="))
        .respond_with(ResponseTemplate::new(200).set_body_string("api-key-123"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/authn/acct/svc/authenticate"))
        .and(body_string("api-key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("raw-session-token"))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthenticationService::new();
    let token = auth.authenticate(&config_for(&server)).await.unwrap();

    // The token is the base64 encoding of the raw response bytes.
    assert_eq!(token.as_str(), BASE64.encode(b"raw-session-token"));
}

#[tokio::test]
async fn authenticate_serves_cached_token_without_network() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    let auth = AuthenticationService::new();
    let config = config_for(&server);

    let first = auth.authenticate(&config).await.unwrap();
    let second = auth.authenticate(&config).await.unwrap();
    assert_eq!(first.as_str(), second.as_str());

    // Only one network handshake happened.
    let logins = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/authn/acct/login")
        .count();
    assert_eq!(logins, 1);

    // Clearing the cache forces a fresh handshake.
    auth.clear_token_cache().await;
    auth.authenticate(&config).await.unwrap();
    let logins = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/authn/acct/login")
        .count();
    assert_eq!(logins, 2);
}

#[tokio::test]
async fn authenticate_maps_401_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/authn/acct/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let auth = AuthenticationService::with_policy(RetryPolicy::no_retries());
    let err = auth.authenticate(&config_for(&server)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[tokio::test]
async fn retrieve_raw_body_becomes_client_secret() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    Mock::given(method("GET"))
        .and(path("/secrets/acct/variable/payment/credentials/c1"))
        .and(header("Authorization", format!("Token token=\"{}\"", BASE64.encode(b"raw-token"))))
        .respond_with(ResponseTemplate::new(200).set_body_string("mysecret"))
        .mount(&server)
        .await;

    let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
    let credential = store.retrieve("c1", &config_for(&server)).await.unwrap();

    assert_eq!(credential.client_id, "c1");
    assert_eq!(credential.client_secret.expose_secret(), "mysecret");
}

#[tokio::test]
async fn retrieve_full_json_record_keeps_metadata() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    let body = json!({
        "client_id": "client-1",
        "client_secret": "Old$Secret1234567",
        "version": "v-1",
        "status": "active"
    });
    Mock::given(method("GET"))
        .and(path("/secrets/acct/variable/payment/credentials/client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
    let credential = store.retrieve("client-1", &config_for(&server)).await.unwrap();

    assert_eq!(credential.client_id, "client-1");
    assert_eq!(credential.client_secret.expose_secret(), "Old$Secret1234567");
    assert_eq!(credential.version.as_deref(), Some("v-1"));
}

#[tokio::test]
async fn retrieve_missing_credential_is_not_found() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    Mock::given(method("GET"))
        .and(path("/secrets/acct/variable/payment/credentials/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store =
        CredentialStore::with_policy(Arc::new(AuthenticationService::new()), RetryPolicy::no_retries());
    let err = store.retrieve("ghost", &config_for(&server)).await.unwrap_err();
    assert!(matches!(err, VaultError::NotFound { .. }));
}

#[tokio::test]
async fn retrieve_prefers_recent_cache_over_unavailable_vault() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    Mock::given(method("GET"))
        .and(path("/secrets/acct/variable/payment/credentials/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("mysecret"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/secrets/acct/variable/payment/credentials/c1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store =
        CredentialStore::with_policy(Arc::new(AuthenticationService::new()), RetryPolicy::no_retries());
    let config = config_for(&server);

    let first = store.retrieve_with_retry("c1", &config).await.unwrap();
    assert_eq!(first.client_secret.expose_secret(), "mysecret");

    // The vault is now failing, but the cached record is still fresh.
    let second = store.retrieve_with_retry("c1", &config).await.unwrap();
    assert_eq!(second.client_secret.expose_secret(), "mysecret");
}

#[tokio::test]
async fn store_posts_structured_payload() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    Mock::given(method("POST"))
        .and(path("/secrets/acct/variable/payment/credentials/client-1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
    let stored = store.store("client-1", "Valid$Secret1234", &config_for(&server)).await.unwrap();
    assert!(stored);

    let requests = server.received_requests().await.unwrap();
    let write = requests
        .iter()
        .find(|r| r.method.to_string() == "POST" && r.url.path().contains("credentials"))
        .expect("credential write request");
    let payload: serde_json::Value = serde_json::from_slice(&write.body).unwrap();
    assert_eq!(payload["client_id"], "client-1");
    assert_eq!(payload["client_secret"], "Valid$Secret1234");
    assert_eq!(payload["status"], "active");
    assert!(payload["version"].is_string());
    assert!(payload["created_at"].is_string());
}

#[tokio::test]
async fn store_returns_false_on_generic_vault_failure() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    Mock::given(method("POST"))
        .and(path("/secrets/acct/variable/payment/credentials/client-1"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
    let stored = store.store("client-1", "Valid$Secret1234", &config_for(&server)).await.unwrap();
    assert!(!stored);
}

#[tokio::test]
async fn store_propagates_permission_error() {
    let server = MockServer::start().await;
    mount_auth(&server, "raw-token").await;

    Mock::given(method("POST"))
        .and(path("/secrets/acct/variable/payment/credentials/client-1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
    let err =
        store.store("client-1", "Valid$Secret1234", &config_for(&server)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
}

#[tokio::test]
async fn store_precondition_failures_never_reach_network() {
    let server = MockServer::start().await;
    let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
    let config = config_for(&server);

    // client_id too short.
    assert!(store.store("ab", "Sh0rt!", &config).await.is_err());
    // Secret missing complexity classes.
    assert!(store.store("client-1", "alllowercase123", &config).await.is_err());

    assert!(server.received_requests().await.unwrap().is_empty());
}
