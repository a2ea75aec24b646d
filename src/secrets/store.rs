//! Vault-backed retrieval and persistence of credential records.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::credential::{validate_client_id, validate_client_secret, Credential};
use crate::auth::AuthenticationService;
use crate::cache::TtlCache;
use crate::config::VaultConfig;
use crate::errors::{ErrorKind, Result, VaultError};
use crate::retry::{RetryExecutor, RetryPolicy};

/// Default lifetime for cached credential records.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(300);

/// Retrieves and persists credential records at per-client vault paths.
///
/// Retrieval is read-through on the credential cache; a successful store
/// does NOT populate the cache, so rotation's final invalidation forces the
/// next reader to fetch the authoritative record.
pub struct CredentialStore {
    http: reqwest::Client,
    auth: Arc<AuthenticationService>,
    credential_cache: Arc<TtlCache<String, Credential>>,
    executor: RetryExecutor,
    credential_ttl: Duration,
}

impl CredentialStore {
    /// Create a store with the default retry policy and a fresh cache.
    pub fn new(auth: Arc<AuthenticationService>) -> Self {
        Self::with_policy(auth, RetryPolicy::default())
    }

    /// Create a store with an explicit retry policy.
    pub fn with_policy(auth: Arc<AuthenticationService>, policy: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            auth,
            credential_cache: Arc::new(TtlCache::new()),
            executor: RetryExecutor::new(policy),
            credential_ttl: DEFAULT_CREDENTIAL_TTL,
        }
    }

    /// Override the credential cache TTL.
    pub fn with_credential_ttl(mut self, ttl: Duration) -> Self {
        self.credential_ttl = ttl;
        self
    }

    /// Fetch the credential record for `client_id` from the vault.
    ///
    /// Returns the cached record when a live entry exists. On a miss, the
    /// response body is interpreted three ways: a JSON object carrying both
    /// `client_id` and `client_secret` deserializes as a full record; any
    /// other JSON becomes the secret verbatim; a non-JSON body becomes the
    /// secret verbatim. The returned record always carries the requested
    /// `client_id`, whatever the payload said.
    pub async fn retrieve(&self, client_id: &str, config: &VaultConfig) -> Result<Credential> {
        config.validate()?;

        if let Some(credential) = self.credential_cache.get(&client_id.to_string()).await {
            debug!(client_id = %client_id, "Credential cache hit");
            return Ok(credential);
        }

        let token = self.auth.authenticate_with_retry(config).await?;
        let url = format!("{}/{}", config.base_url(), config.credential_path(client_id));
        let resource = format!("credential '{}'", client_id);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, token.header_value())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VaultError::from_status(status.as_u16(), &resource));
        }
        let body = response.text().await?;

        let credential = parse_credential_body(client_id, &body);
        self.credential_cache
            .put(client_id.to_string(), credential.clone(), self.credential_ttl)
            .await;

        debug!(client_id = %client_id, "Retrieved credential from vault");
        Ok(credential)
    }

    /// [`Self::retrieve`] under the retry policy, with a last-resort read of
    /// the live cache after exhaustion.
    ///
    /// The fallback only serves a non-expired entry: a recent cached secret
    /// beats total unavailability, but logically expired values are never
    /// served.
    pub async fn retrieve_with_retry(
        &self,
        client_id: &str,
        config: &VaultConfig,
    ) -> Result<Credential> {
        let result =
            self.executor.execute("retrieve_credential", || self.retrieve(client_id, config)).await;

        match result {
            Ok(credential) => Ok(credential),
            Err(error) => {
                if let Some(cached) = self.credential_cache.get(&client_id.to_string()).await {
                    warn!(
                        client_id = %client_id,
                        error = %error,
                        "Vault retrieval failed, serving cached credential"
                    );
                    return Ok(cached);
                }
                Err(error)
            }
        }
    }

    /// Build a fresh active record for `client_id` and persist it.
    ///
    /// Returns `Ok(true)` on success and `Ok(false)` on a generic vault
    /// failure; authentication, permission, connection, and precondition
    /// failures propagate as typed errors.
    pub async fn store(
        &self,
        client_id: &str,
        client_secret: &str,
        config: &VaultConfig,
    ) -> Result<bool> {
        let record = Credential::new_active(client_id, client_secret);
        self.store_record(&record, config).await
    }

    /// [`Self::store`] under the retry policy.
    pub async fn store_with_retry(
        &self,
        client_id: &str,
        client_secret: &str,
        config: &VaultConfig,
    ) -> Result<bool> {
        let record = Credential::new_active(client_id, client_secret);
        self.executor.execute("store_credential", || self.store_record(&record, config)).await
    }

    /// Persist a full credential record (secret plus lifecycle metadata) at
    /// the client's vault path. Rotation uses this to co-write rotation
    /// state with the secret in one round trip.
    pub async fn store_record(&self, record: &Credential, config: &VaultConfig) -> Result<bool> {
        config.validate()?;
        validate_client_id(&record.client_id)?;
        validate_client_secret(record.client_secret.expose_secret())?;

        let token = self.auth.authenticate_with_retry(config).await?;
        let url = format!("{}/{}", config.base_url(), config.credential_path(&record.client_id));
        let resource = format!("credential '{}'", record.client_id);

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, token.header_value())
            .json(&record.to_wire_json())
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            info!(client_id = %record.client_id, "Stored credential in vault");
            return Ok(true);
        }

        let error = VaultError::from_status(status.as_u16(), &resource);
        match error.kind() {
            ErrorKind::Authentication | ErrorKind::Permission | ErrorKind::Connection => Err(error),
            _ => {
                warn!(client_id = %record.client_id, error = %error, "Credential store failed");
                Ok(false)
            }
        }
    }

    /// Drop the cached record for one client. Called when rotation completes
    /// so subsequent readers fetch the now-authoritative new secret.
    pub async fn invalidate_credential(&self, client_id: &str) {
        self.credential_cache.invalidate(&client_id.to_string()).await;
    }

    /// Drop all cached credential records. Used by test teardown.
    pub async fn clear_credential_cache(&self) {
        self.credential_cache.clear().await;
    }

    /// The live cached record for a client, if any. Exposed for rotation
    /// bookkeeping and tests; never triggers a vault call.
    pub async fn cached_credential(&self, client_id: &str) -> Option<Credential> {
        self.credential_cache.get(&client_id.to_string()).await
    }
}

/// Interpret a vault response body as a credential record.
fn parse_credential_body(client_id: &str, body: &str) -> Credential {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let has_pair = value
            .as_object()
            .map(|map| map.contains_key("client_id") && map.contains_key("client_secret"))
            .unwrap_or(false);
        if has_pair {
            if let Ok(mut credential) = serde_json::from_value::<Credential>(value) {
                // The requested id wins even if the payload disagrees.
                credential.client_id = client_id.to_string();
                return credential;
            }
        }
        // JSON without the pair: the whole document is the secret.
        return Credential::bare(client_id, body);
    }
    // Not JSON: the whole body is the secret.
    Credential::bare(client_id, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::CredentialStatus;

    #[test]
    fn test_parse_full_json_record() {
        let body = r#"{"client_id":"server-said-this","client_secret":"s3cret","version":"v1","status":"active"}"#;
        let credential = parse_credential_body("c1", body);
        assert_eq!(credential.client_id, "c1");
        assert_eq!(credential.client_secret.expose_secret(), "s3cret");
        assert_eq!(credential.version.as_deref(), Some("v1"));
        assert_eq!(credential.status, Some(CredentialStatus::Active));
    }

    #[test]
    fn test_parse_json_without_pair_becomes_secret() {
        let body = r#"{"value":"opaque"}"#;
        let credential = parse_credential_body("c1", body);
        assert_eq!(credential.client_id, "c1");
        assert_eq!(credential.client_secret.expose_secret(), body);
        assert!(credential.version.is_none());
    }

    #[test]
    fn test_parse_raw_body_becomes_secret() {
        let credential = parse_credential_body("c1", "mysecret");
        assert_eq!(credential.client_id, "c1");
        assert_eq!(credential.client_secret.expose_secret(), "mysecret");
    }

    #[tokio::test]
    async fn test_store_rejects_short_client_id() {
        let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
        let config = VaultConfig::new("https://vault.example.com", "acct", "svc");
        let err = store.store("ab", "Valid$Secret1234", &config).await.unwrap_err();
        assert!(matches!(err, VaultError::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_store_rejects_weak_secret() {
        let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
        let config = VaultConfig::new("https://vault.example.com", "acct", "svc");

        let err = store.store("client-1", "Sh0rt!", &config).await.unwrap_err();
        assert!(matches!(err, VaultError::Precondition { .. }));

        let err = store.store("client-1", "alllowercase123", &config).await.unwrap_err();
        assert!(matches!(err, VaultError::Precondition { .. }));
    }

    #[tokio::test]
    async fn test_invalidate_clears_single_entry() {
        let store = CredentialStore::new(Arc::new(AuthenticationService::new()));
        store
            .credential_cache
            .put("c1".to_string(), Credential::bare("c1", "s"), Duration::from_secs(60))
            .await;

        store.invalidate_credential("c1").await;
        assert!(store.cached_credential("c1").await.is_none());
    }
}
