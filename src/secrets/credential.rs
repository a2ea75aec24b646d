//! Credential record types, validation, and generation.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::types::SecretString;
use crate::errors::{Result, VaultError};
use crate::rotation::RotationState;

static CLIENT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("client id pattern is valid"));

/// Characters a generated secret is drawn from. All four complexity classes
/// are represented so redraws converge quickly.
const SECRET_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*-_=+";

/// Lifecycle status of a credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Active,
}

/// Rotation lifecycle metadata, embedded inside the credential record so a
/// single round trip updates both the secret and its state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotationMetadata {
    /// Current rotation state.
    pub state: RotationState,

    /// Version string of the credential being replaced.
    pub old_version: Option<String>,

    /// When the rotation began.
    pub started_at: DateTime<Utc>,

    /// Length of the dual-validity window, in seconds.
    pub transition_period_seconds: u64,

    /// When the rotation reached its terminal state, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A managed `client_id`/`client_secret` pair with lifecycle metadata.
///
/// The derived `Serialize` impl redacts the secret (safe for logs); the wire
/// form written to the vault is produced by [`Credential::to_wire_json`],
/// which exposes it deliberately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub client_id: String,

    pub client_secret: SecretString,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Opaque version identifier, fresh per write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CredentialStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationMetadata>,
}

impl Credential {
    /// Build a credential record holding only the pair, no metadata. Used
    /// when the vault returns a bare secret body.
    pub fn bare(client_id: impl Into<String>, client_secret: impl Into<SecretString>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            created_at: None,
            updated_at: None,
            version: None,
            status: None,
            rotation: None,
        }
    }

    /// Build a fully populated active record with fresh timestamps and a
    /// fresh opaque version.
    pub fn new_active(
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Self {
        let now = Utc::now();
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            created_at: Some(now),
            updated_at: Some(now),
            version: Some(Uuid::new_v4().to_string()),
            status: Some(CredentialStatus::Active),
            rotation: None,
        }
    }

    /// The JSON document persisted to the vault. This is the single point
    /// where the secret value leaves the redacting wrapper.
    pub fn to_wire_json(&self) -> serde_json::Value {
        let mut doc = json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret.expose_secret(),
        });
        let map = doc.as_object_mut().expect("literal is an object");
        if let Some(created_at) = &self.created_at {
            map.insert("created_at".into(), json!(created_at));
        }
        if let Some(updated_at) = &self.updated_at {
            map.insert("updated_at".into(), json!(updated_at));
        }
        if let Some(version) = &self.version {
            map.insert("version".into(), json!(version));
        }
        if let Some(status) = &self.status {
            map.insert("status".into(), json!(status));
        }
        if let Some(rotation) = &self.rotation {
            map.insert(
                "rotation".into(),
                serde_json::to_value(rotation).expect("rotation metadata serializes"),
            );
        }
        doc
    }
}

/// Validate a client identifier: non-empty, at least 3 characters, limited
/// to `[A-Za-z0-9_-]`.
pub fn validate_client_id(client_id: &str) -> Result<()> {
    if client_id.is_empty() {
        return Err(VaultError::precondition("client_id cannot be empty"));
    }
    if client_id.len() < 3 {
        return Err(VaultError::precondition(format!(
            "client_id must be at least 3 characters, got {}",
            client_id.len()
        )));
    }
    if !CLIENT_ID_PATTERN.is_match(client_id) {
        return Err(VaultError::precondition(
            "client_id may only contain letters, digits, underscores, and hyphens",
        ));
    }
    Ok(())
}

/// Validate secret complexity: at least 16 characters containing an
/// uppercase letter, a lowercase letter, a digit, and a non-alphanumeric
/// character. The error text never echoes the value.
pub fn validate_client_secret(client_secret: &str) -> Result<()> {
    if client_secret.len() < 16 {
        return Err(VaultError::precondition("client_secret must be at least 16 characters"));
    }
    let has_upper = client_secret.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = client_secret.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = client_secret.chars().any(|c| c.is_ascii_digit());
    let has_special = client_secret.chars().any(|c| !c.is_alphanumeric());
    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(VaultError::precondition(
            "client_secret must contain uppercase, lowercase, digit, and special characters",
        ));
    }
    Ok(())
}

/// Generate a random secret of `length` characters, redrawing until it
/// satisfies the complexity rule.
pub fn generate_secret(length: usize) -> SecretString {
    let mut rng = rand::thread_rng();
    loop {
        let candidate: String = (0..length)
            .map(|_| *SECRET_CHARSET.choose(&mut rng).expect("charset is non-empty") as char)
            .collect();
        if validate_client_secret(&candidate).is_ok() {
            return SecretString::new(candidate);
        }
    }
}

/// Generate a fresh random client identifier.
pub fn generate_client_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: u32 = rng.gen_range(0..1_000_000);
    format!("client-{}-{:06}", Uuid::new_v4().simple(), suffix)
}
