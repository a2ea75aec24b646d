//! The rotation state machine driver.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::monitor::UsageMonitor;
use super::state::{RotationResult, RotationState};
use crate::config::{RotationConfig, VaultConfig};
use crate::errors::{ErrorKind, VaultError};
use crate::retry::RetryPolicy;
use crate::secrets::{generate_secret, Credential, CredentialStore, RotationMetadata};

/// Drives a client's credential through the rotation state machine.
///
/// One `rotate` call is one sequential chain: no internal fan-out, no
/// cancellation token. Callers rotating several clients concurrently spawn
/// a task per client. Writes are plain read-modify-write with no
/// optimistic-concurrency check, so two rotations racing the same
/// `client_id` can lose updates; the transition table only guards this
/// process's own sequence.
pub struct RotationOrchestrator {
    store: Arc<CredentialStore>,
    monitor: UsageMonitor,
    policy: RetryPolicy,
}

impl RotationOrchestrator {
    /// Create an orchestrator with the default usage monitor and retry
    /// policy.
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store, monitor: UsageMonitor::default(), policy: RetryPolicy::default() }
    }

    /// Replace the usage monitor (e.g. with one backed by real metrics).
    pub fn with_monitor(mut self, monitor: UsageMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Replace the retry policy used by `rotate_with_retry`.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rotate the credential for `client_id`.
    ///
    /// Never returns an error: every outcome is a [`RotationResult`]. On
    /// failure, `result.state` is the highest state successfully persisted
    /// to the vault, so schedulers can tell a rotation that never started
    /// from one that died mid-transition.
    pub async fn rotate(
        &self,
        client_id: &str,
        config: &VaultConfig,
        rotation_config: &RotationConfig,
    ) -> RotationResult {
        match self.rotate_attempt(client_id, config, rotation_config).await {
            Ok(result) => result,
            Err((result, _kind)) => result,
        }
    }

    /// [`Self::rotate`] retried under the policy when the failure kind is
    /// retryable. A final failure still returns a structured result.
    pub async fn rotate_with_retry(
        &self,
        client_id: &str,
        config: &VaultConfig,
        rotation_config: &RotationConfig,
    ) -> RotationResult {
        let mut attempt: u32 = 0;
        loop {
            match self.rotate_attempt(client_id, config, rotation_config).await {
                Ok(result) => return result,
                Err((result, kind)) => {
                    if !self.policy.is_retryable(kind) || attempt >= self.policy.max_retries {
                        return result;
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        client_id = %client_id,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_retries + 1,
                        state = %result.state,
                        "Rotation failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One full pass of the state machine. `Err` carries the failure result
    /// plus the error kind so the retry wrapper can classify it.
    async fn rotate_attempt(
        &self,
        client_id: &str,
        config: &VaultConfig,
        rotation_config: &RotationConfig,
    ) -> Result<RotationResult, (RotationResult, ErrorKind)> {
        // Step 1: local validation, before any vault call.
        if let Err(e) = rotation_config.validate() {
            error!(client_id = %client_id, error = %e, "Rotation config invalid");
            return Err((RotationResult::failed(client_id, e.to_string()), e.kind()));
        }

        // Step 2: capture the existing credential and its version.
        let mut existing = match self.store.retrieve_with_retry(client_id, config).await {
            Ok(credential) => credential,
            Err(e) => {
                error!(client_id = %client_id, error = %e, "Rotation aborted, retrieval failed");
                return Err((RotationResult::failed(client_id, e.to_string()), e.kind()));
            }
        };
        let old_version = existing.version.clone();
        let started_at = Utc::now();
        let mut reached: Option<RotationState> = None;

        info!(
            client_id = %client_id,
            old_version = old_version.as_deref().unwrap_or("<none>"),
            transition_period_seconds = rotation_config.transition_period_seconds,
            "Starting credential rotation"
        );

        // Step 3: mark the existing record INITIATED.
        existing.rotation = Some(RotationMetadata {
            state: RotationState::Initiated,
            old_version: old_version.clone(),
            started_at,
            transition_period_seconds: rotation_config.transition_period_seconds,
            completed_at: None,
        });
        existing.updated_at = Some(started_at);
        if let Err(e) =
            self.persist(&existing, config, &mut reached, RotationState::Initiated).await
        {
            return Err(self.failure(client_id, reached, &old_version, None, started_at, e));
        }

        // Step 4: generate the replacement credential.
        let secret = generate_secret(rotation_config.secret_length);
        let mut record = Credential::new_active(client_id, secret);
        let new_version = record.version.clone();

        // Step 5: the single write that activates the new secret and opens
        // the dual-validity window. Dual validity is a logical contract for
        // upstream authenticators; this engine only tracks state honestly.
        record.rotation = Some(RotationMetadata {
            state: RotationState::DualActive,
            old_version: old_version.clone(),
            started_at,
            transition_period_seconds: rotation_config.transition_period_seconds,
            completed_at: None,
        });
        if let Err(e) =
            self.persist(&record, config, &mut reached, RotationState::DualActive).await
        {
            return Err(self.failure(
                client_id,
                reached,
                &old_version,
                new_version.clone(),
                started_at,
                e,
            ));
        }

        // Step 6: wait out (or shorten) the transition window.
        let clean = self.monitor.await_transition(client_id, rotation_config).await;

        // Step 7: the old credential is no longer honored.
        if let Some(rotation) = record.rotation.as_mut() {
            rotation.state = RotationState::OldDeprecated;
        }
        if let Err(e) =
            self.persist(&record, config, &mut reached, RotationState::OldDeprecated).await
        {
            return Err(self.failure(
                client_id,
                reached,
                &old_version,
                new_version.clone(),
                started_at,
                e,
            ));
        }

        // Step 8: finish, then invalidate so readers fetch the new secret.
        let mut completed_at = None;
        if clean {
            let now = Utc::now();
            if let Some(rotation) = record.rotation.as_mut() {
                rotation.state = RotationState::NewActive;
                rotation.completed_at = Some(now);
            }
            record.updated_at = Some(now);
            if let Err(e) =
                self.persist(&record, config, &mut reached, RotationState::NewActive).await
            {
                return Err(self.failure(
                    client_id,
                    reached,
                    &old_version,
                    new_version.clone(),
                    started_at,
                    e,
                ));
            }
            completed_at = Some(now);
            self.store.invalidate_credential(client_id).await;
        }

        let state = reached.expect("at least one state was persisted");
        let success = state == RotationState::NewActive;
        if success {
            info!(
                client_id = %client_id,
                new_version = new_version.as_deref().unwrap_or("<none>"),
                "Credential rotation completed"
            );
        }

        Ok(RotationResult {
            client_id: client_id.to_string(),
            success,
            state,
            old_version,
            new_version,
            started_at,
            completed_at,
            error_message: None,
        })
    }

    /// Persist a record and advance the in-process state marker. The
    /// transition table is enforced here, the single point every state
    /// write funnels through.
    async fn persist(
        &self,
        record: &Credential,
        config: &VaultConfig,
        reached: &mut Option<RotationState>,
        to: RotationState,
    ) -> Result<(), VaultError> {
        if let Some(from) = *reached {
            if !from.can_transition_to(to) {
                return Err(VaultError::precondition(format!(
                    "illegal rotation transition {} -> {}",
                    from, to
                )));
            }
        }

        let stored = self.store.store_record(record, config).await?;
        if !stored {
            return Err(VaultError::vault(
                0,
                format!("vault rejected rotation state write ({})", to),
            ));
        }

        *reached = Some(to);
        info!(client_id = %record.client_id, state = %to, "Persisted rotation state");
        Ok(())
    }

    /// Build the failure pair for the retry wrapper: the structured result
    /// (carrying the highest persisted state) plus the error kind.
    fn failure(
        &self,
        client_id: &str,
        reached: Option<RotationState>,
        old_version: &Option<String>,
        new_version: Option<String>,
        started_at: chrono::DateTime<Utc>,
        error: VaultError,
    ) -> (RotationResult, ErrorKind) {
        let state = reached.unwrap_or(RotationState::Failed);
        error!(
            client_id = %client_id,
            state = %state,
            error = %error,
            "Credential rotation failed"
        );
        let result = RotationResult {
            client_id: client_id.to_string(),
            success: false,
            state,
            old_version: old_version.clone(),
            new_version,
            started_at,
            completed_at: None,
            error_message: Some(error.to_string()),
        };
        (result, error.kind())
    }
}
