//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of this subsystem.

use crate::domain::{AdmissionOutcome, Address, ProcessedBundle};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Secret admission API.
///
/// Called by the enclave's block-processing loop once per layer-1 bundle.
/// Callers must not run two passes concurrently; the identity store is the
/// only state shared between passes.
#[async_trait]
pub trait SecretAdmissionApi: Send + Sync {
    /// Process the registry events of one bundle.
    ///
    /// Initialize events are handled before request events, each kind in
    /// list order. Per-event failures are logged and skipped. When
    /// `can_share` is false the returned responses are always empty, but
    /// identity store writes still happen.
    ///
    /// Cancelling `cancel` abandons the in-flight request and returns the
    /// responses accumulated so far with `cancelled` set.
    async fn process_network_secret_msgs(
        &self,
        cancel: &CancellationToken,
        bundle: &ProcessedBundle,
        can_share: bool,
    ) -> AdmissionOutcome;

    /// Local enclave id used as the attester of every response.
    fn enclave_id(&self) -> Address;

    /// Layer-1 chain id used as the response domain separator.
    fn l1_chain_id(&self) -> i64;
}
