//! Usage monitoring during the dual-validity window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info};

use crate::config::RotationConfig;

/// Consecutive quiescent samples required for an early exit.
pub const QUIESCENT_TICKS_REQUIRED: u32 = 3;

/// Source of the "is the old credential still being exercised?" signal.
///
/// Real deployments back this with access logs or metrics; the shipped
/// [`DecayingUsageProbe`] is a stand-in. Rotation only consumes the boolean,
/// so implementations are free to sample whatever they have.
#[async_trait]
pub trait UsageSignal: Send + Sync {
    /// Sample whether the old credential saw use recently. `elapsed` and
    /// `window` describe progress through the transition period.
    async fn old_credential_in_use(
        &self,
        client_id: &str,
        elapsed: Duration,
        window: Duration,
    ) -> bool;
}

/// Placeholder probe: reports usage with a probability that decays from an
/// initial high value toward a floor as the window elapses.
#[derive(Debug, Clone)]
pub struct DecayingUsageProbe {
    initial_probability: f64,
    floor_probability: f64,
}

impl Default for DecayingUsageProbe {
    fn default() -> Self {
        Self { initial_probability: 0.9, floor_probability: 0.1 }
    }
}

impl DecayingUsageProbe {
    pub fn new(initial_probability: f64, floor_probability: f64) -> Self {
        Self { initial_probability, floor_probability }
    }

    fn probability(&self, elapsed: Duration, window: Duration) -> f64 {
        let progress = if window.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / window.as_secs_f64()).clamp(0.0, 1.0)
        };
        self.floor_probability + (self.initial_probability - self.floor_probability) * (1.0 - progress)
    }
}

#[async_trait]
impl UsageSignal for DecayingUsageProbe {
    async fn old_credential_in_use(
        &self,
        _client_id: &str,
        elapsed: Duration,
        window: Duration,
    ) -> bool {
        let p = self.probability(elapsed, window);
        rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Polls a [`UsageSignal`] through the transition window.
pub struct UsageMonitor {
    signal: Arc<dyn UsageSignal>,
    quiescent_ticks_required: u32,
}

impl Default for UsageMonitor {
    fn default() -> Self {
        Self::new(Arc::new(DecayingUsageProbe::default()))
    }
}

impl UsageMonitor {
    pub fn new(signal: Arc<dyn UsageSignal>) -> Self {
        Self { signal, quiescent_ticks_required: QUIESCENT_TICKS_REQUIRED }
    }

    /// Wait out the transition window, sampling the usage signal each
    /// monitoring interval.
    ///
    /// Returns `true` as soon as the signal has been quiescent for
    /// [`QUIESCENT_TICKS_REQUIRED`] consecutive ticks, and unconditionally
    /// once the window elapses; the monitor never blocks rotation
    /// indefinitely.
    pub async fn await_transition(&self, client_id: &str, config: &RotationConfig) -> bool {
        let window = config.transition_period();
        let interval = config.monitoring_interval();
        let start = tokio::time::Instant::now();
        let mut quiescent_ticks: u32 = 0;

        loop {
            if start.elapsed() >= window {
                info!(client_id = %client_id, "Transition period elapsed");
                return true;
            }

            tokio::time::sleep(interval).await;
            let elapsed = start.elapsed();
            if elapsed >= window {
                info!(client_id = %client_id, "Transition period elapsed");
                return true;
            }

            if self.signal.old_credential_in_use(client_id, elapsed, window).await {
                quiescent_ticks = 0;
                debug!(client_id = %client_id, "Old credential still in use");
            } else {
                quiescent_ticks += 1;
                debug!(
                    client_id = %client_id,
                    quiescent_ticks = quiescent_ticks,
                    "Old credential quiescent"
                );
                if quiescent_ticks >= self.quiescent_ticks_required {
                    info!(
                        client_id = %client_id,
                        elapsed_secs = elapsed.as_secs(),
                        "Old credential quiescent, ending transition early"
                    );
                    return true;
                }
            }
        }
    }
}
