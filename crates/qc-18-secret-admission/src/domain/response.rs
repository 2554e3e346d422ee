//! # Network Secret Response Hash
//!
//! The preimage signed by the attesting enclave. This layout is checked
//! bit-for-bit by the on-chain registry, so it is a wire contract:
//!
//! ```text
//! requester_id (20) || len(sealed_secret) as u32 BE (4) || sealed_secret
//!                   || l1_chain_id as i64 BE (8) || registry_address (20)
//! ```
//!
//! Chain id and registry address act as a domain separator against
//! cross-chain and cross-registry replay.

use super::entities::{Address, Hash};
use super::keys::keccak256;
use crate::error::{AdmissionError, AdmissionResult};

/// Build the response preimage.
pub fn response_preimage(
    requester_id: &Address,
    sealed_secret: &[u8],
    l1_chain_id: i64,
    registry_address: &Address,
) -> AdmissionResult<Vec<u8>> {
    let secret_len = u32::try_from(sealed_secret.len()).map_err(|_| {
        AdmissionError::Hashing(format!(
            "sealed secret of {} bytes exceeds the 4-byte length prefix",
            sealed_secret.len()
        ))
    })?;

    let mut preimage = Vec::with_capacity(20 + 4 + sealed_secret.len() + 8 + 20);
    preimage.extend_from_slice(requester_id);
    preimage.extend_from_slice(&secret_len.to_be_bytes());
    preimage.extend_from_slice(sealed_secret);
    preimage.extend_from_slice(&l1_chain_id.to_be_bytes());
    preimage.extend_from_slice(registry_address);
    Ok(preimage)
}

/// Keccak-256 of [`response_preimage`].
pub fn create_response_hash(
    requester_id: &Address,
    sealed_secret: &[u8],
    l1_chain_id: i64,
    registry_address: &Address,
) -> AdmissionResult<Hash> {
    let preimage = response_preimage(requester_id, sealed_secret, l1_chain_id, registry_address)?;
    Ok(keccak256(&preimage))
}
