//! # Shared Secret Admission Subsystem (QC-18)
//!
//! Admits new enclaves into the confidential network by handing them an
//! encrypted copy of the network secret once their TEE attestation checks out.
//!
//! **Subsystem ID:** 18
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Flow
//!
//! For every layer-1 bundle the block-processing loop hands over:
//!
//! 1. `InitializeSecret` events register the genesis enclave's key without
//!    attestation verification. The registry contract only emits them on the
//!    genesis path, so the contract's authorization is the guard.
//! 2. `RequestSecret` events are verified, bound, sealed, persisted, hashed
//!    and signed into a [`SecretResponse`].
//! 3. Responses leave the processor only when the caller may share the secret.
//!    Identity writes are kept either way.
//!
//! ## Module Structure
//!
//! ```text
//! qc-18-secret-admission/
//! ├── domain/      # Entities, attestation codec, key formats, response hash
//! ├── ports/       # SecretAdmissionApi, collaborator capabilities
//! ├── adapters/    # In-memory store, k256 signer, ECIES sealer, mock verifier
//! ├── service/     # SharedSecretProcessor + builder
//! └── telemetry.rs # tracing subscriber setup
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use adapters::{
    open_sealed_secret, EciesSecretSealer, InMemoryIdentityStore, LocalEnclaveSigner,
    MockAttestationVerifier, NetworkSecret, SelectorRegistryCodec,
};
pub use domain::{
    compress, create_response_hash, decode_attestation, decompress, encode_attestation,
    enclave_id_from_public_key, keccak256, recover_signer, response_preimage, verify_identity,
    AdmissionConfig, AdmissionOutcome, Address, AttestationReport, BlockHeader,
    CompressedPublicKey, EventKind, EventRecord, Hash, InitializeSecretEvent, ProcessedBundle,
    RecoverableSignature, RequestSecretEvent, SecretResponse, TypedEvent,
    UncompressedPublicKey, VerifiedIdentity,
};
pub use error::{AdmissionError, AdmissionResult};
pub use ports::{
    AttestationVerifier, CodecError, IdentityStore, RegistryCodec, SealError, SecretAdmissionApi,
    SecretSealer, SignError, SigningService, StoreError, VerifierError,
};
pub use service::{SharedSecretProcessor, SharedSecretProcessorBuilder};
pub use telemetry::{init_tracing, TelemetryConfig};
pub use tokio_util::sync::CancellationToken;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
