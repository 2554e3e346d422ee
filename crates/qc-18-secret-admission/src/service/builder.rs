//! Builder for [`SharedSecretProcessor`].
//!
//! Every collaborator is injected explicitly; there are no defaults.

use super::SharedSecretProcessor;
use crate::domain::AdmissionConfig;
use crate::error::{AdmissionError, AdmissionResult};
use crate::ports::outbound::{
    AttestationVerifier, IdentityStore, RegistryCodec, SecretSealer, SigningService,
};
use std::sync::Arc;

/// Collects the processor's configuration and collaborators.
pub struct SharedSecretProcessorBuilder<C, V, S, I, K> {
    config: Option<AdmissionConfig>,
    registry_codec: Option<Arc<C>>,
    attestation_verifier: Option<Arc<V>>,
    secret_sealer: Option<Arc<S>>,
    identity_store: Option<Arc<I>>,
    signing_service: Option<Arc<K>>,
}

impl<C, V, S, I, K> Default for SharedSecretProcessorBuilder<C, V, S, I, K> {
    fn default() -> Self {
        Self {
            config: None,
            registry_codec: None,
            attestation_verifier: None,
            secret_sealer: None,
            identity_store: None,
            signing_service: None,
        }
    }
}

impl<C, V, S, I, K> SharedSecretProcessorBuilder<C, V, S, I, K>
where
    C: RegistryCodec,
    V: AttestationVerifier,
    S: SecretSealer,
    I: IdentityStore,
    K: SigningService,
{
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the local enclave configuration.
    pub fn config(mut self, config: AdmissionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the registry transaction decoder.
    pub fn registry_codec(mut self, codec: Arc<C>) -> Self {
        self.registry_codec = Some(codec);
        self
    }

    /// Set the attestation verification backend.
    pub fn attestation_verifier(mut self, verifier: Arc<V>) -> Self {
        self.attestation_verifier = Some(verifier);
        self
    }

    /// Set the network secret sealer.
    pub fn secret_sealer(mut self, sealer: Arc<S>) -> Self {
        self.secret_sealer = Some(sealer);
        self
    }

    /// Set the identity store.
    pub fn identity_store(mut self, store: Arc<I>) -> Self {
        self.identity_store = Some(store);
        self
    }

    /// Set the enclave signing service.
    pub fn signing_service(mut self, signer: Arc<K>) -> Self {
        self.signing_service = Some(signer);
        self
    }

    /// Build the processor.
    ///
    /// # Errors
    ///
    /// `MissingComponent` when a collaborator or the config was never set,
    /// `Config` when the config fails validation.
    pub fn build(self) -> AdmissionResult<SharedSecretProcessor<C, V, S, I, K>> {
        let config = self
            .config
            .ok_or(AdmissionError::MissingComponent("config"))?;
        config.validate()?;

        Ok(SharedSecretProcessor {
            config,
            registry_codec: self
                .registry_codec
                .ok_or(AdmissionError::MissingComponent("registry_codec"))?,
            attestation_verifier: self
                .attestation_verifier
                .ok_or(AdmissionError::MissingComponent("attestation_verifier"))?,
            secret_sealer: self
                .secret_sealer
                .ok_or(AdmissionError::MissingComponent("secret_sealer"))?,
            identity_store: self
                .identity_store
                .ok_or(AdmissionError::MissingComponent("identity_store"))?,
            signing_service: self
                .signing_service
                .ok_or(AdmissionError::MissingComponent("signing_service"))?,
        })
    }
}
