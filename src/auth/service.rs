//! Session-token acquisition against the vault's authn endpoints.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::cache::{TokenCacheKey, TtlCache};
use crate::config::VaultConfig;
use crate::errors::{Result, VaultError};
use crate::retry::{RetryExecutor, RetryPolicy};

/// Fixed lifetime for cached session tokens.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(600);

/// A vault session token, base64-encoded for header transport.
///
/// The raw token body the vault returns is not header-safe; the encoded form
/// is what goes into `Authorization: Token token="..."`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Encode a raw vault token body into its transport form.
    pub fn from_raw(raw: &str) -> Self {
        Self(BASE64.encode(raw.as_bytes()))
    }

    /// The base64-encoded token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full `Authorization` header value for authenticated vault calls.
    pub fn header_value(&self) -> String {
        format!("Token token=\"{}\"", self.0)
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthToken([REDACTED])")
    }
}

/// Obtains and caches vault session tokens.
///
/// # Thread Safety
///
/// `Send + Sync`; a single instance is shared across retrieval and rotation
/// calls.
pub struct AuthenticationService {
    http: reqwest::Client,
    token_cache: Arc<TtlCache<TokenCacheKey, AuthToken>>,
    executor: RetryExecutor,
    token_ttl: Duration,
}

impl Default for AuthenticationService {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationService {
    /// Create a service with the default retry policy and a fresh token
    /// cache.
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    /// Create a service with an explicit retry policy.
    pub fn with_policy(policy: RetryPolicy) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            token_cache: Arc::new(TtlCache::new()),
            executor: RetryExecutor::new(policy),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Override the token cache TTL.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Obtain a session token for the configured identity.
    ///
    /// Checks the token cache first; on a miss, performs the certificate
    /// handshake when a certificate is configured, otherwise the two-step
    /// login/authenticate fallback. The successful result is written through
    /// the cache.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Precondition`] if the config fails validation
    /// - [`VaultError::Authentication`] on HTTP 401
    /// - [`VaultError::Connection`] on transport failure or 5xx
    pub async fn authenticate(&self, config: &VaultConfig) -> Result<AuthToken> {
        config.validate()?;

        let cache_key =
            TokenCacheKey::new(config.base_url(), &config.account, &config.authn_login);
        if let Some(token) = self.token_cache.get(&cache_key).await {
            debug!(account = %config.account, login = %config.authn_login, "Token cache hit");
            return Ok(token);
        }

        let raw = match &config.cert_path {
            Some(cert_path) => self.certificate_authenticate(config, cert_path).await?,
            None => {
                warn!(
                    account = %config.account,
                    login = %config.authn_login,
                    "No client certificate configured, falling back to login-based authentication"
                );
                self.login_authenticate(config).await?
            }
        };

        let token = AuthToken::from_raw(&raw);
        self.token_cache.put(cache_key, token.clone(), self.token_ttl).await;

        info!(account = %config.account, login = %config.authn_login, "Authenticated to vault");
        Ok(token)
    }

    /// [`Self::authenticate`] wrapped in the retry executor; connection
    /// failures are retried, identity failures are not.
    pub async fn authenticate_with_retry(&self, config: &VaultConfig) -> Result<AuthToken> {
        self.executor.execute("authenticate", || self.authenticate(config)).await
    }

    /// Drop all cached session tokens. Used by rotation-completion hooks and
    /// test teardown.
    pub async fn clear_token_cache(&self) {
        self.token_cache.clear().await;
    }

    fn authenticate_url(&self, config: &VaultConfig) -> String {
        format!(
            "{}/authn/{}/{}/authenticate",
            config.base_url(),
            config.account,
            config.authn_login
        )
    }

    /// Certificate-authenticated POST to the authenticate endpoint. A
    /// dedicated client carries the PEM identity for this call only.
    async fn certificate_authenticate(
        &self,
        config: &VaultConfig,
        cert_path: &std::path::Path,
    ) -> Result<String> {
        let pem = tokio::fs::read(cert_path).await.map_err(|e| {
            VaultError::precondition(format!(
                "failed to read client certificate {}: {}",
                cert_path.display(),
                e
            ))
        })?;
        let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
            VaultError::precondition(format!("invalid client certificate: {}", e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .use_rustls_tls()
            .identity(identity)
            .build()
            .map_err(VaultError::from)?;

        let response = client.post(self.authenticate_url(config)).send().await?;
        read_body(response, "session token").await
    }

    /// Two-step fallback: basic-auth login for an API key, then exchange the
    /// key for a session token.
    async fn login_authenticate(&self, config: &VaultConfig) -> Result<String> {
        let login_url = format!("{}/authn/{}/login", config.base_url(), config.account);
        let response = self
            .http
            .get(login_url)
            .basic_auth(&config.authn_login, Some(""))
            .send()
            .await?;
        let api_key = read_body(response, "login API key").await?;

        let response =
            self.http.post(self.authenticate_url(config)).body(api_key).send().await?;
        read_body(response, "session token").await
    }
}

/// Check status, map failures, and return the response body.
async fn read_body(response: reqwest::Response, resource: &str) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(VaultError::from_status(status.as_u16(), resource));
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_encoding_matches_base64_of_raw_bytes() {
        let token = AuthToken::from_raw("raw-session-token");
        assert_eq!(token.as_str(), BASE64.encode("raw-session-token".as_bytes()));
    }

    #[test]
    fn test_header_value_format() {
        let token = AuthToken::from_raw("tok");
        assert_eq!(token.header_value(), format!("Token token=\"{}\"", BASE64.encode(b"tok")));
    }

    #[test]
    fn test_token_debug_redacts() {
        let token = AuthToken::from_raw("raw-session-token");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("raw-session-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_invalid_config_never_reaches_network() {
        let service = AuthenticationService::new();
        let config = VaultConfig::new("", "acct", "svc");
        let err = service.authenticate(&config).await.unwrap_err();
        assert!(matches!(err, VaultError::Precondition { .. }));
    }
}
