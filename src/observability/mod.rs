//! # Observability
//!
//! Structured logging for the credential engine using the tracing
//! ecosystem. Collaborator binaries (schedulers, CLIs) call
//! [`init_logging`] once at startup; the engine itself only emits events.
//!
//! Secret material never appears in log fields; tokens and secrets are
//! wrapped in redacting types before they reach any event.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// The filter is taken from `RUST_LOG` when set, falling back to
/// `default_level`. With `json` set, events are emitted as single-line JSON
/// for log shippers.
///
/// Returns quietly if a subscriber is already installed (tests call this
/// repeatedly).
pub fn init_logging(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if json { builder.json().try_init() } else { builder.try_init() };

    if result.is_ok() {
        tracing::debug!(json = json, "Logging initialized");
    }
}
