//! # Credential Rotation
//!
//! The rotation state machine and its supporting pieces: the closed
//! [`RotationState`] enum with its transition table, the pluggable
//! [`UsageSignal`] seam sampled during the dual-validity window, and the
//! [`RotationOrchestrator`] that drives a credential from `INITIATED`
//! through `NEW_ACTIVE`.
//!
//! Rotation never raises to its caller: every outcome is a structured
//! [`RotationResult`] whose `state` field records the highest state the
//! machine successfully persisted.

mod monitor;
mod orchestrator;
mod state;

pub use monitor::{DecayingUsageProbe, UsageMonitor, UsageSignal, QUIESCENT_TICKS_REQUIRED};
pub use orchestrator::RotationOrchestrator;
pub use state::{RotationResult, RotationState};
