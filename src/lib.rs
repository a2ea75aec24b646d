//! # Keyturn
//!
//! Keyturn is a credential lifecycle and rotation engine for services that
//! authenticate to a Conjur-style secrets vault. It obtains short-lived
//! session tokens, fetches and persists `client_id`/`client_secret` pairs,
//! and rotates those pairs with a dual-validity transition window so
//! in-flight callers keep working.
//!
//! ## Architecture
//!
//! ```text
//! RotationOrchestrator → CredentialStore → AuthenticationService
//!         ↓                     ↓                   ↓
//!    UsageMonitor        credential cache      token cache
//!                               ↘                 ↙
//!                              RetryExecutor (wraps every vault call)
//! ```
//!
//! ## Core Components
//!
//! - **AuthenticationService**: certificate or login-fallback handshake for
//!   vault session tokens, cached by `(url, account, login)`
//! - **CredentialStore**: retrieval and persistence of credential records at
//!   per-client vault paths, with a TTL cache and stale-read resilience
//! - **RotationOrchestrator**: the `INITIATED → DUAL_ACTIVE →
//!   OLD_DEPRECATED → NEW_ACTIVE` state machine with usage-monitored early
//!   exit
//! - **RetryExecutor**: bounded retries with exponential backoff and jitter
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keyturn::{
//!     AuthenticationService, CredentialStore, RotationConfig,
//!     RotationOrchestrator, VaultConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> keyturn::Result<()> {
//!     let config = VaultConfig::from_env()?;
//!     let auth = Arc::new(AuthenticationService::new());
//!     let store = Arc::new(CredentialStore::new(auth));
//!     let orchestrator = RotationOrchestrator::new(store);
//!
//!     let result = orchestrator
//!         .rotate_with_retry("payments-api", &config, &RotationConfig::default())
//!         .await;
//!     println!("rotation finished in state {}", result.state);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod errors;
pub mod observability;
pub mod retry;
pub mod rotation;
pub mod secrets;

// Re-export commonly used types and traits
pub use auth::{AuthToken, AuthenticationService};
pub use cache::{TokenCacheKey, TtlCache};
pub use config::{RotationConfig, VaultConfig};
pub use errors::{ErrorKind, Result, VaultError};
pub use observability::init_logging;
pub use retry::{RetryExecutor, RetryPolicy};
pub use rotation::{
    DecayingUsageProbe, RotationOrchestrator, RotationResult, RotationState, UsageMonitor,
    UsageSignal,
};
pub use secrets::{Credential, CredentialStore, RotationMetadata, SecretString};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
