//! # Error Handling
//!
//! Error types for the keyturn credential engine, built on `thiserror`.
//! Expected vault-response failures (missing credential, denied access) are
//! modeled as [`VaultError`] variants returned through [`Result`]; panics are
//! reserved for programming errors.

mod types;

pub use types::{ErrorKind, Result, VaultError};
