//! # Error Types
//!
//! The error taxonomy for vault operations. Every failure a caller can
//! recover from carries a [`ErrorKind`] so the retry layer can classify it
//! without matching on variants.

use thiserror::Error;

/// Custom result type for keyturn operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Main error type for vault-facing operations.
///
/// Messages are sanitized: secret material never appears in error text.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Network failure, timeout, or a 5xx response from the vault.
    #[error("Vault connection failed: {message}")]
    Connection { message: String },

    /// The vault rejected our identity (HTTP 401).
    #[error("Vault authentication failed: {message}")]
    Authentication { message: String },

    /// The vault denied access to the resource (HTTP 403).
    #[error("Vault permission denied: {message}")]
    Permission { message: String },

    /// The requested resource does not exist in the vault (HTTP 404).
    #[error("Vault resource not found: {resource}")]
    NotFound { resource: String },

    /// Local validation failed before any network attempt was made.
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    /// Any other non-2xx response from the vault. `status` is 0 when the
    /// failure did not come with an HTTP status.
    #[error("Vault operation failed: {message}")]
    Vault { status: u16, message: String },
}

/// Discriminant of [`VaultError`], used for retry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Authentication,
    Permission,
    NotFound,
    Precondition,
    Vault,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Vault => "vault",
        };
        write!(f, "{}", name)
    }
}

impl VaultError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication { message: message.into() }
    }

    /// Create a permission error.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission { message: message.into() }
    }

    /// Create a not-found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a precondition (local validation) error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition { message: message.into() }
    }

    /// Create a generic vault error for an unexpected status code.
    pub fn vault(status: u16, message: impl Into<String>) -> Self {
        Self::Vault { status, message: message.into() }
    }

    /// Map a non-success HTTP status to the matching error variant.
    ///
    /// `resource` names what was being accessed, for error text only.
    pub fn from_status(status: u16, resource: &str) -> Self {
        match status {
            401 => Self::authentication(format!("vault returned 401 for {}", resource)),
            403 => Self::permission(format!("vault returned 403 for {}", resource)),
            404 => Self::not_found(resource),
            s if s >= 500 => Self::connection(format!("vault returned {} for {}", s, resource)),
            s => Self::vault(s, format!("unexpected status {} for {}", s, resource)),
        }
    }

    /// The kind of this error, for retry classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Connection { .. } => ErrorKind::Connection,
            VaultError::Authentication { .. } => ErrorKind::Authentication,
            VaultError::Permission { .. } => ErrorKind::Permission,
            VaultError::NotFound { .. } => ErrorKind::NotFound,
            VaultError::Precondition { .. } => ErrorKind::Precondition,
            VaultError::Vault { .. } => ErrorKind::Vault,
        }
    }

    /// Check if this error is retryable under the default policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection)
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(error: reqwest::Error) -> Self {
        // Transport-level failures (DNS, refused connection, timeout) are all
        // retryable connection errors. reqwest's Display output never
        // includes request bodies, so the message is safe to surface.
        Self::Connection { message: error.to_string() }
    }
}
