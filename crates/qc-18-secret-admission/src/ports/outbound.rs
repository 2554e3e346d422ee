//! # Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators the admission processor consumes. Every call is treated as
//! potentially blocking and is raced against the pass's cancellation token.

use crate::domain::{
    Address, AttestationReport, CompressedPublicKey, Hash, RecoverableSignature, TypedEvent,
    UncompressedPublicKey, VerifiedIdentity,
};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error from registry transaction decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Calldata shorter than a function selector
    #[error("Transaction too short: {0} bytes")]
    TooShort(usize),

    /// Selector does not belong to a registry admission function
    #[error("Unknown function selector: {0}")]
    UnknownSelector(String),

    /// Arguments could not be decoded
    #[error("Malformed call arguments: {0}")]
    Malformed(String),
}

/// Error from attestation verification.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Report is structurally invalid for this verifier
    #[error("Malformed report: {0}")]
    MalformedReport(String),

    /// Quote did not pass verification
    #[error("Attestation rejected: {0}")]
    Rejected(String),

    /// Verification backend could not be reached
    #[error("Verifier unavailable: {0}")]
    Unavailable(String),
}

/// Error from sealing the network secret.
#[derive(Debug, Error)]
pub enum SealError {
    /// Recipient key is not a secp256k1 point
    #[error("Invalid recipient key")]
    InvalidRecipientKey,

    /// AEAD encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Sealed payload could not be opened
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Error from the identity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend failure
    #[error("Storage backend failure: {0}")]
    Backend(String),

    /// The write observed cancellation before completing
    #[error("Store operation cancelled")]
    Cancelled,
}

/// Error from the enclave signing service.
#[derive(Debug, Error)]
pub enum SignError {
    /// Signing failed
    #[error("Signing failed: {0}")]
    Failed(String),
}

/// Decoder for enclave registry transactions.
#[async_trait]
pub trait RegistryCodec: Send + Sync {
    /// Decode raw calldata into a typed registry event.
    async fn decode(&self, transaction: &[u8]) -> Result<TypedEvent, CodecError>;

    /// On-chain address of the registry contract.
    fn registry_address(&self) -> Address;
}

/// TEE attestation verification backend (hardware or mock).
#[async_trait]
pub trait AttestationVerifier: Send + Sync {
    /// Verify a report and return the identity its quote binds.
    async fn verify(&self, report: &AttestationReport) -> Result<VerifiedIdentity, VerifierError>;
}

/// Seals the network secret for a recipient enclave.
#[async_trait]
pub trait SecretSealer: Send + Sync {
    /// Encrypt the network secret under `recipient`.
    async fn encrypt_under(&self, recipient: &CompressedPublicKey) -> Result<Vec<u8>, SealError>;
}

/// Persistent enclave-id to public-key bindings.
///
/// Implementations must serialize concurrent writes to the same enclave id.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Record the binding `enclave_id -> public_key`.
    async fn store_enclave(
        &self,
        cancel: &CancellationToken,
        enclave_id: Address,
        public_key: UncompressedPublicKey,
    ) -> Result<(), StoreError>;
}

/// Signing over the local enclave's attested key.
#[async_trait]
pub trait SigningService: Send + Sync {
    /// Produce a 65-byte recoverable signature over a 32-byte hash.
    async fn sign(&self, hash: &Hash) -> Result<RecoverableSignature, SignError>;
}
