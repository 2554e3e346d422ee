//! # Adapters Layer (Hexagonal Architecture)
//!
//! Concrete collaborators for the outbound ports.

mod identity_store;
mod mock_verifier;
mod registry_codec;
mod sealer;
mod signer;

pub use identity_store::InMemoryIdentityStore;
pub use mock_verifier::{mock_report_body, MockAttestationVerifier, REPORT_DATA_LEN};
pub use registry_codec::{
    SelectorRegistryCodec, INITIALIZE_SECRET_SIGNATURE, REQUEST_SECRET_SIGNATURE,
};
pub use sealer::{open_sealed_secret, EciesSecretSealer, NetworkSecret, SEALED_HEADER_LEN};
pub use signer::LocalEnclaveSigner;
