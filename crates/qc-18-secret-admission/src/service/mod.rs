//! # Shared Secret Processor
//!
//! Dispatches the registry events of one layer-1 bundle:
//!
//! 1. `InitializeSecret` events: decode, store the genesis enclave's key.
//! 2. `RequestSecret` events: decode, verify, bind, seal, store, hash, sign.
//! 3. Gate: responses are dropped unless the caller may share the secret.
//!
//! Per-event failures are logged and skipped. Every collaborator call is raced
//! against the pass's cancellation token.

mod builder;


pub use builder::SharedSecretProcessorBuilder;

use crate::domain::{
    create_response_hash, decode_attestation, decompress, to_hex, verify_identity,
    AdmissionConfig, AdmissionOutcome, Address, AttestationReport, EventKind, EventRecord,
    ProcessedBundle, SecretResponse, TypedEvent,
};
use crate::error::{AdmissionError, AdmissionResult};
use crate::ports::inbound::SecretAdmissionApi;
use crate::ports::outbound::{
    AttestationVerifier, IdentityStore, RegistryCodec, SecretSealer, SigningService,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Admission processor over its five collaborators.
pub struct SharedSecretProcessor<C, V, S, I, K>
where
    C: RegistryCodec,
    V: AttestationVerifier,
    S: SecretSealer,
    I: IdentityStore,
    K: SigningService,
{
    config: AdmissionConfig,
    registry_codec: Arc<C>,
    attestation_verifier: Arc<V>,
    secret_sealer: Arc<S>,
    identity_store: Arc<I>,
    signing_service: Arc<K>,
}

/// Marker for a bundle pass stopped by its cancellation token.
struct Interrupted;

impl<C, V, S, I, K> SharedSecretProcessor<C, V, S, I, K>
where
    C: RegistryCodec,
    V: AttestationVerifier,
    S: SecretSealer,
    I: IdentityStore,
    K: SigningService,
{
    /// Start building a processor.
    pub fn builder() -> SharedSecretProcessorBuilder<C, V, S, I, K> {
        SharedSecretProcessorBuilder::new()
    }

    /// Configuration the processor was built with.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Process the registry events of one bundle.
    ///
    /// See [`SecretAdmissionApi::process_network_secret_msgs`].
    pub async fn process_network_secret_msgs(
        &self,
        cancel: &CancellationToken,
        bundle: &ProcessedBundle,
        can_share: bool,
    ) -> AdmissionOutcome {
        let header = bundle.block_header;
        let span = info_span!(
            "secret_admission",
            correlation_id = %Uuid::new_v4(),
            block_height = header.number,
            block_hash = %to_hex(&header.hash),
        );

        async move {
            let mut outcome = AdmissionOutcome::default();
            if self.run_pass(cancel, bundle, &mut outcome).await.is_err() {
                warn!(
                    produced = outcome.responses.len(),
                    "[qc-18] Bundle pass cancelled"
                );
                outcome.cancelled = true;
            }

            if !can_share {
                // Identity writes stay; only the responses are withheld
                outcome.responses.clear();
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_pass(
        &self,
        cancel: &CancellationToken,
        bundle: &ProcessedBundle,
        outcome: &mut AdmissionOutcome,
    ) -> Result<(), Interrupted> {
        for record in bundle.events_of(EventKind::InitializeSecret) {
            self.handle_initialize(cancel, record).await?;
        }

        let header = bundle.block_header;
        for record in bundle.events_of(EventKind::RequestSecret) {
            let request = match self.decode_event(cancel, record).await? {
                Some(TypedEvent::Request(request)) => request,
                Some(TypedEvent::Initialize(_)) => {
                    debug!(tx_hash = %to_hex(&record.tx_hash), "[qc-18] Skipping misclassified event");
                    continue;
                }
                None => continue,
            };

            info!(
                block_height = header.number,
                block_hash = %to_hex(&header.hash),
                tx_hash = %to_hex(&record.tx_hash),
                "[qc-18] Process shared secret request"
            );

            match self.process_secret_request(cancel, &request.attestation).await {
                Ok(response) => outcome.responses.push(response),
                Err(AdmissionError::Cancelled) => return Err(Interrupted),
                Err(e) => {
                    error!(
                        tx_hash = %to_hex(&record.tx_hash),
                        error = %e,
                        "[qc-18] Failed to process shared secret request"
                    );
                }
            }
        }

        Ok(())
    }

    async fn handle_initialize(
        &self,
        cancel: &CancellationToken,
        record: &EventRecord,
    ) -> Result<(), Interrupted> {
        let event = match self.decode_event(cancel, record).await? {
            Some(TypedEvent::Initialize(event)) => event,
            Some(TypedEvent::Request(_)) => {
                debug!(tx_hash = %to_hex(&record.tx_hash), "[qc-18] Skipping misclassified event");
                return Ok(());
            }
            None => return Ok(()),
        };

        let report = match decode_attestation(&event.attestation) {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "[qc-18] Could not decode attestation report");
                return Ok(());
            }
        };

        // Genesis path: the registry contract authorizes this event, no quote check
        match self.store_attestation(cancel, &report).await {
            Ok(()) => Ok(()),
            Err(AdmissionError::Cancelled) => Err(Interrupted),
            Err(e) => {
                error!(error = %e, "[qc-18] Could not store the attestation report");
                Ok(())
            }
        }
    }

    /// Decode a registry transaction. `None` means it was logged and skipped.
    async fn decode_event(
        &self,
        cancel: &CancellationToken,
        record: &EventRecord,
    ) -> Result<Option<TypedEvent>, Interrupted> {
        match until_cancelled(cancel, self.registry_codec.decode(&record.transaction)).await {
            Ok(event) => Ok(Some(event)),
            Err(AdmissionError::Cancelled) => Err(Interrupted),
            Err(e) => {
                warn!(
                    tx_hash = %to_hex(&record.tx_hash),
                    error = %e,
                    "[qc-18] Could not decode transaction"
                );
                Ok(None)
            }
        }
    }

    async fn process_secret_request(
        &self,
        cancel: &CancellationToken,
        attestation: &[u8],
    ) -> AdmissionResult<SecretResponse> {
        let report = decode_attestation(attestation)?;

        let sealed_secret = self.verify_and_seal(cancel, &report).await?;

        // Only attested keys are stored; an unstored enclave cannot use the secret
        self.store_attestation(cancel, &report).await?;

        let hash = create_response_hash(
            &report.enclave_id,
            &sealed_secret,
            self.config.l1_chain_id,
            &self.registry_codec.registry_address(),
        )?;

        let signature = until_cancelled(cancel, self.signing_service.sign(&hash)).await?;

        debug!(owner = %to_hex(&report.enclave_id), "[qc-18] Processed secret request");

        Ok(SecretResponse {
            sealed_secret,
            requester_id: report.enclave_id,
            attester_id: self.config.enclave_id,
            host_address: report.host_address,
            signature,
        })
    }

    async fn verify_and_seal(
        &self,
        cancel: &CancellationToken,
        report: &AttestationReport,
    ) -> AdmissionResult<Vec<u8>> {
        let verified = until_cancelled(cancel, self.attestation_verifier.verify(report)).await?;
        verify_identity(&verified, report)?;

        info!(
            owner = %to_hex(&report.enclave_id),
            "[qc-18] Successfully verified attestation and identity"
        );

        until_cancelled(cancel, self.secret_sealer.encrypt_under(&report.public_key)).await
    }

    async fn store_attestation(
        &self,
        cancel: &CancellationToken,
        report: &AttestationReport,
    ) -> AdmissionResult<()> {
        info!(owner = %to_hex(&report.enclave_id), "[qc-18] Store attestation");

        let key = decompress(&report.public_key)?;
        until_cancelled(
            cancel,
            self.identity_store
                .store_enclave(cancel, report.enclave_id, key),
        )
        .await
    }
}

/// Race a collaborator call against cancellation.
///
/// A failure observed after the token fired counts as cancellation, so
/// collaborators that honor the token themselves report the same way.
async fn until_cancelled<T, E, F>(cancel: &CancellationToken, call: F) -> AdmissionResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<AdmissionError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AdmissionError::Cancelled),
        result = call => match result {
            Ok(value) => Ok(value),
            Err(_) if cancel.is_cancelled() => Err(AdmissionError::Cancelled),
            Err(e) => Err(e.into()),
        },
    }
}

#[async_trait]
impl<C, V, S, I, K> SecretAdmissionApi for SharedSecretProcessor<C, V, S, I, K>
where
    C: RegistryCodec,
    V: AttestationVerifier,
    S: SecretSealer,
    I: IdentityStore,
    K: SigningService,
{
    async fn process_network_secret_msgs(
        &self,
        cancel: &CancellationToken,
        bundle: &ProcessedBundle,
        can_share: bool,
    ) -> AdmissionOutcome {
        SharedSecretProcessor::process_network_secret_msgs(self, cancel, bundle, can_share).await
    }

    fn enclave_id(&self) -> Address {
        self.config.enclave_id
    }

    fn l1_chain_id(&self) -> i64 {
        self.config.l1_chain_id
    }
}
