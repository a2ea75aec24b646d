//! # Configuration Settings
//!
//! Defines the vault connection and rotation configuration structures.

use crate::errors::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Default vault path template for credential records.
///
/// `{account}` and `{client_id}` are substituted at request time.
pub const DEFAULT_CREDENTIAL_PATH_TEMPLATE: &str =
    "secrets/{account}/variable/payment/credentials/{client_id}";

fn default_path_template() -> String {
    DEFAULT_CREDENTIAL_PATH_TEMPLATE.to_string()
}

/// Connection settings for the secrets vault.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VaultConfig {
    /// Vault base URL (e.g., "https://vault.example.com")
    #[validate(length(min = 1, message = "Vault URL cannot be empty"))]
    pub url: String,

    /// Vault organization account
    #[validate(length(min = 1, message = "Vault account cannot be empty"))]
    pub account: String,

    /// Login identity used for authentication
    #[validate(length(min = 1, message = "Authentication login cannot be empty"))]
    pub authn_login: String,

    /// Path to a PEM client certificate. When absent, authentication falls
    /// back to the two-step login flow.
    pub cert_path: Option<PathBuf>,

    /// Template for the per-client credential path in the vault.
    #[serde(default = "default_path_template")]
    pub credential_path_template: String,
}

impl VaultConfig {
    /// Create a configuration with the default credential path template.
    pub fn new(
        url: impl Into<String>,
        account: impl Into<String>,
        authn_login: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            account: account.into(),
            authn_login: authn_login.into(),
            cert_path: None,
            credential_path_template: default_path_template(),
        }
    }

    /// Set the client certificate path.
    pub fn with_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_path = Some(path.into());
        self
    }

    /// Override the credential path template.
    pub fn with_path_template(mut self, template: impl Into<String>) -> Self {
        self.credential_path_template = template.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `CONJUR_URL`: vault base URL (required)
    /// - `CONJUR_ACCOUNT`: organization account (required)
    /// - `CONJUR_AUTHN_LOGIN`: login identity (required)
    /// - `CONJUR_CERT_PATH`: optional client certificate path
    /// - `KEYTURN_CREDENTIAL_PATH_TEMPLATE`: optional path template override
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("CONJUR_URL")
            .map_err(|_| VaultError::precondition("CONJUR_URL environment variable not set"))?;
        let account = std::env::var("CONJUR_ACCOUNT")
            .map_err(|_| VaultError::precondition("CONJUR_ACCOUNT environment variable not set"))?;
        let authn_login = std::env::var("CONJUR_AUTHN_LOGIN").map_err(|_| {
            VaultError::precondition("CONJUR_AUTHN_LOGIN environment variable not set")
        })?;
        let cert_path = std::env::var("CONJUR_CERT_PATH").ok().map(PathBuf::from);
        let credential_path_template = std::env::var("KEYTURN_CREDENTIAL_PATH_TEMPLATE")
            .unwrap_or_else(|_| default_path_template());

        Ok(Self { url, account, authn_login, cert_path, credential_path_template })
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)
            .map_err(|e| VaultError::precondition(format!("invalid vault config: {}", e)))?;
        self.validate_custom()
    }

    /// Custom validation logic beyond what the validator crate covers.
    fn validate_custom(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| VaultError::precondition(format!("invalid vault URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(VaultError::precondition(format!(
                "vault URL scheme must be http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if !self.credential_path_template.contains("{client_id}") {
            return Err(VaultError::precondition(
                "credential path template must contain the {client_id} placeholder",
            ));
        }

        if let Some(path) = &self.cert_path {
            if !path.is_file() {
                return Err(VaultError::precondition(format!(
                    "client certificate not found at {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Render the credential path for a client, without the base URL.
    pub fn credential_path(&self, client_id: &str) -> String {
        self.credential_path_template
            .replace("{account}", &self.account)
            .replace("{client_id}", client_id)
    }

    /// The vault base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Timing settings for a credential rotation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RotationConfig {
    /// Length of the dual-validity transition window, in seconds.
    #[validate(range(min = 1, message = "Transition period must be positive"))]
    pub transition_period_seconds: u64,

    /// Interval between usage-monitor samples, in seconds. Must be shorter
    /// than the transition period.
    #[validate(range(min = 1, message = "Monitoring interval must be positive"))]
    pub monitoring_interval_seconds: u64,

    /// Length of generated client secrets.
    #[validate(range(min = 16, message = "Secret length must be at least 16"))]
    pub secret_length: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            transition_period_seconds: 86_400,
            monitoring_interval_seconds: 300,
            secret_length: 32,
        }
    }
}

impl RotationConfig {
    /// Validate the rotation configuration.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)
            .map_err(|e| VaultError::precondition(format!("invalid rotation config: {}", e)))?;

        if self.monitoring_interval_seconds >= self.transition_period_seconds {
            return Err(VaultError::precondition(
                "monitoring interval must be shorter than the transition period",
            ));
        }

        Ok(())
    }

    /// Transition window as a [`Duration`].
    pub fn transition_period(&self) -> Duration {
        Duration::from_secs(self.transition_period_seconds)
    }

    /// Monitoring interval as a [`Duration`].
    pub fn monitoring_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring_interval_seconds)
    }
}
