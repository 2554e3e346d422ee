//! # Domain Layer
//!
//! Pure admission logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod attestation;
pub mod config;
pub mod entities;
pub mod keys;
pub mod response;

pub use attestation::{decode_attestation, encode_attestation, verify_identity};
pub use config::AdmissionConfig;
pub use entities::*;
pub use keys::{compress, decompress, enclave_id_from_public_key, keccak256, recover_signer};
pub use response::{create_response_hash, response_preimage};
