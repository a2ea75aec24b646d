//! # Configuration
//!
//! Configuration surface consumed by the credential engine: vault connection
//! settings and rotation timing. Both structs are validated before any
//! network call is attempted; invalid configuration is a precondition
//! failure, never a runtime fault.

mod settings;

pub use settings::{RotationConfig, VaultConfig, DEFAULT_CREDENTIAL_PATH_TEMPLATE};
