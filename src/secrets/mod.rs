//! # Credential Records & Storage
//!
//! The credential data model and the vault-backed store.
//!
//! A [`Credential`] is a `client_id`/`client_secret` pair plus lifecycle
//! metadata, persisted as a single JSON record at a per-client vault path so
//! that one read-modify-write round trip updates both the secret and its
//! rotation state. The vault is the single source of truth; the credential
//! cache is a strictly derived, invalidateable view.
//!
//! # Example
//!
//! ```rust,ignore
//! use keyturn::{AuthenticationService, CredentialStore, VaultConfig};
//!
//! let auth = Arc::new(AuthenticationService::new());
//! let store = CredentialStore::new(auth);
//!
//! let config = VaultConfig::new("https://vault.example.com", "acct", "svc");
//! let credential = store.retrieve_with_retry("payments-api", &config).await?;
//! let ok = store.store_with_retry("payments-api", "N3w$ecretValue123", &config).await?;
//! ```

mod credential;
mod store;
mod types;

pub use credential::{
    generate_client_id, generate_secret, validate_client_id, validate_client_secret, Credential,
    CredentialStatus, RotationMetadata,
};
pub use store::{CredentialStore, DEFAULT_CREDENTIAL_TTL};
pub use types::SecretString;
