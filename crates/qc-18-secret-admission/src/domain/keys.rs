//! # secp256k1 Key Formats
//!
//! Conversions between the wire format (33-byte SEC1 compressed) and the
//! storage format (64-byte X || Y), address derivation, and signer recovery.
//!
//! Uses the k256 crate for all curve operations.

use super::entities::{
    Address, CompressedPublicKey, Hash, RecoverableSignature, UncompressedPublicKey,
    COMPRESSED_PUBLIC_KEY_LEN, UNCOMPRESSED_PUBLIC_KEY_LEN,
};
use crate::error::{AdmissionError, AdmissionResult};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha3::{Digest, Keccak256};

/// Keccak256 hash function.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Decode a compressed key to its X || Y form.
///
/// Fails when the bytes are not a point on secp256k1.
pub fn decompress(key: &CompressedPublicKey) -> AdmissionResult<UncompressedPublicKey> {
    let public = PublicKey::from_sec1_bytes(key.as_bytes())
        .map_err(|e| AdmissionError::InvalidPublicKey(e.to_string()))?;
    Ok(uncompressed_from_point(&public))
}

/// Re-compress an X || Y key.
pub fn compress(key: &UncompressedPublicKey) -> AdmissionResult<CompressedPublicKey> {
    let public = public_key_from_uncompressed(key)?;
    let encoded = public.to_encoded_point(true);

    let mut bytes = [0u8; COMPRESSED_PUBLIC_KEY_LEN];
    bytes.copy_from_slice(encoded.as_bytes());
    Ok(CompressedPublicKey::from_bytes(bytes))
}

/// Derive the enclave id (Ethereum-style address) of a public key.
pub fn enclave_id_from_public_key(key: &UncompressedPublicKey) -> Address {
    let hash = keccak256(key.as_bytes());
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Recover the signer's public key from a response signature.
///
/// Only recovery ids 0 and 1 are accepted.
pub fn recover_signer(
    hash: &Hash,
    signature: &RecoverableSignature,
) -> AdmissionResult<UncompressedPublicKey> {
    let recovery_id = match signature.v() {
        0 => RecoveryId::new(false, false),
        1 => RecoveryId::new(true, false),
        v => {
            return Err(AdmissionError::InvalidSignature(format!(
                "recovery id {v} is not 0 or 1"
            )))
        }
    };

    let sig = Signature::from_slice(&signature.as_bytes()[..64])
        .map_err(|e| AdmissionError::InvalidSignature(e.to_string()))?;

    let recovered = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
        .map_err(|e| AdmissionError::InvalidSignature(e.to_string()))?;

    Ok(uncompressed_from_point(&PublicKey::from(&recovered)))
}

pub(crate) fn public_key_from_uncompressed(
    key: &UncompressedPublicKey,
) -> AdmissionResult<PublicKey> {
    let mut sec1 = [0u8; UNCOMPRESSED_PUBLIC_KEY_LEN + 1];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(key.as_bytes());
    PublicKey::from_sec1_bytes(&sec1).map_err(|e| AdmissionError::InvalidPublicKey(e.to_string()))
}

fn uncompressed_from_point(public: &PublicKey) -> UncompressedPublicKey {
    // 0x04 || X || Y
    let encoded = public.to_encoded_point(false);
    let mut bytes = [0u8; UNCOMPRESSED_PUBLIC_KEY_LEN];
    bytes.copy_from_slice(&encoded.as_bytes()[1..]);
    UncompressedPublicKey::from_bytes(bytes)
}
