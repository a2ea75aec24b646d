//! # Vault Authentication
//!
//! Obtains short-lived session tokens from the vault, preferring the
//! client-certificate handshake and falling back to the two-step
//! login/authenticate flow when no certificate is configured.
//!
//! Tokens are cached by `(url, account, login)` for a fixed TTL; the vault
//! does not assert an expiry in the observed protocol.

mod service;

pub use service::{AuthToken, AuthenticationService, DEFAULT_TOKEN_TTL};
