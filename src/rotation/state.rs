//! Rotation state machine types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// States of a credential rotation.
///
/// Legal forward order is `Initiated -> DualActive -> OldDeprecated ->
/// NewActive`; `Failed` is reachable from any non-terminal state and is
/// terminal. `NewActive` is the only success terminal. Transition legality
/// is checked at a single point, [`RotationState::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationState {
    Initiated,
    DualActive,
    OldDeprecated,
    NewActive,
    Failed,
}

impl RotationState {
    /// Whether this state ends the rotation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RotationState::NewActive | RotationState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: RotationState) -> bool {
        match (self, next) {
            (RotationState::Initiated, RotationState::DualActive) => true,
            (RotationState::DualActive, RotationState::OldDeprecated) => true,
            (RotationState::OldDeprecated, RotationState::NewActive) => true,
            // Any non-terminal state may fail.
            (from, RotationState::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for RotationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RotationState::Initiated => "INITIATED",
            RotationState::DualActive => "DUAL_ACTIVE",
            RotationState::OldDeprecated => "OLD_DEPRECATED",
            RotationState::NewActive => "NEW_ACTIVE",
            RotationState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Structured outcome of a rotation attempt.
///
/// `state` is the highest state the machine successfully persisted: a
/// failure after the `INITIATED` write reports `Initiated`, not `Failed`,
/// so partial progress is never masked. `error_message` is sanitized and
/// safe to log or display.
#[derive(Debug, Clone, Serialize)]
pub struct RotationResult {
    pub client_id: String,
    pub success: bool,
    pub state: RotationState,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl RotationResult {
    /// A failure result for a rotation that never persisted any state.
    pub(crate) fn failed(client_id: &str, message: impl Into<String>) -> Self {
        Self {
            client_id: client_id.to_string(),
            success: false,
            state: RotationState::Failed,
            old_version: None,
            new_version: None,
            started_at: Utc::now(),
            completed_at: None,
            error_message: Some(message.into()),
        }
    }
}
