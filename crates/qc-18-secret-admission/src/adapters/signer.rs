//! Local Enclave Signer Adapter
//!
//! Implements `SigningService` with the enclave's attested secp256k1 key.
//!
//! ## Security Notes
//!
//! - RFC 6979 deterministic nonces
//! - Low-S normalization (EIP-2); the recovery id is flipped to match
//! - Recovery id is emitted as 0 or 1, never 27/28

use crate::domain::{
    decompress, enclave_id_from_public_key, Address, CompressedPublicKey, Hash,
    RecoverableSignature, UncompressedPublicKey, SIGNATURE_LEN,
};
use crate::error::{AdmissionError, AdmissionResult};
use crate::ports::outbound::{SignError, SigningService};
use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use std::fmt;

/// Signer over the local enclave key.
pub struct LocalEnclaveSigner {
    signing_key: SigningKey,
    public_key: CompressedPublicKey,
    enclave_id: Address,
}

impl LocalEnclaveSigner {
    /// Wrap an existing signing key.
    pub fn new(signing_key: SigningKey) -> AdmissionResult<Self> {
        let encoded = signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(encoded.as_bytes());
        let public_key = CompressedPublicKey::from_bytes(bytes);
        let enclave_id = enclave_id_from_public_key(&decompress(&public_key)?);

        Ok(Self {
            signing_key,
            public_key,
            enclave_id,
        })
    }

    /// Generate a fresh random key.
    pub fn generate() -> AdmissionResult<Self> {
        Self::new(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Load from 32 secret key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> AdmissionResult<Self> {
        let signing_key = SigningKey::from_bytes(bytes.into())
            .map_err(|e| AdmissionError::Signing(SignError::Failed(e.to_string())))?;
        Self::new(signing_key)
    }

    /// Enclave id derived from the signing key.
    pub fn enclave_id(&self) -> Address {
        self.enclave_id
    }

    /// Compressed public key.
    pub fn public_key(&self) -> CompressedPublicKey {
        self.public_key
    }

    /// Uncompressed public key, the form response verifiers recover.
    pub fn uncompressed_public_key(&self) -> AdmissionResult<UncompressedPublicKey> {
        decompress(&self.public_key)
    }

    fn sign_hash(&self, hash: &Hash) -> Result<RecoverableSignature, SignError> {
        let (mut signature, mut recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| SignError::Failed(e.to_string()))?;

        if let Some(normalized) = signature.normalize_s() {
            signature = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        // x-reduced ids (2, 3) cannot be expressed in the 0/1 wire format
        if recovery_id.is_x_reduced() {
            return Err(SignError::Failed(
                "recovery id requires x-reduction".to_string(),
            ));
        }

        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature::from_bytes(bytes))
    }
}

impl fmt::Debug for LocalEnclaveSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the signing key
        f.debug_struct("LocalEnclaveSigner")
            .field("enclave_id", &crate::domain::to_hex(&self.enclave_id))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningService for LocalEnclaveSigner {
    async fn sign(&self, hash: &Hash) -> Result<RecoverableSignature, SignError> {
        self.sign_hash(hash)
    }
}
