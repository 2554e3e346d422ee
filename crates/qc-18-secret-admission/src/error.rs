//! Error types for the Secret Admission subsystem

use crate::ports::outbound::{CodecError, SealError, SignError, StoreError, VerifierError};
use thiserror::Error;

/// Secret admission errors.
///
/// None of these is fatal to the enclave: the processor turns each one into a
/// skipped event or a dropped response and keeps going.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Attestation blob is malformed
    #[error("Failed to decode attestation: {0}")]
    Decode(String),

    /// Registry transaction could not be decoded
    #[error("Could not decode registry transaction: {0}")]
    Codec(#[from] CodecError),

    /// Public key bytes are not a secp256k1 point
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Attestation verifier rejected the report
    #[error("Unable to verify report: {0}")]
    Verification(#[from] VerifierError),

    /// Report key differs from the key bound inside the verified quote
    #[error("Unable to verify identity: report presents {reported}, quote binds {attested}")]
    IdentityMismatch { reported: String, attested: String },

    /// Secret sealer failed
    #[error("Failed to seal network secret: {0}")]
    Seal(#[from] SealError),

    /// Identity store write failed
    #[error("Could not store attested key: {0}")]
    Storage(#[from] StoreError),

    /// Response preimage could not be built
    #[error("Failed to create network secret response hash: {0}")]
    Hashing(String),

    /// Signing service failed
    #[error("Failed to sign network secret response: {0}")]
    Signing(#[from] SignError),

    /// Signature bytes are malformed or do not recover a key
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Host cancelled the pass
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Builder was missing a collaborator
    #[error("Missing component: {0}")]
    MissingComponent(&'static str),

    /// Tracing subscriber could not be installed
    #[error("Telemetry initialization failed: {0}")]
    Telemetry(String),
}

/// Result type for admission operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;
