//! # ECIES Secret Sealer
//!
//! Seals the network secret to a requester's compressed secp256k1 key.
//!
//! ```text
//! sealed = ephemeral_pubkey (33) || nonce (24) || ciphertext + tag
//! key    = SHA-256(KDF_TAG || ECDH(ephemeral, recipient).x || ephemeral_pubkey)
//! ```
//!
//! ## Security
//!
//! - Fresh ephemeral key and nonce per seal, so equal inputs never repeat output
//! - XChaCha20-Poly1305 with a 192-bit random nonce
//! - The network secret and derived keys are zeroized on drop

use crate::domain::{CompressedPublicKey, COMPRESSED_PUBLIC_KEY_LEN};
use crate::ports::outbound::{SealError, SecretSealer};
use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

const KDF_TAG: &[u8] = b"qc-18/network-secret/v1";
const NONCE_LEN: usize = 24;

/// Bytes preceding the ciphertext in a sealed payload.
pub const SEALED_HEADER_LEN: usize = COMPRESSED_PUBLIC_KEY_LEN + NONCE_LEN;

/// The 32-byte network secret. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NetworkSecret {
    inner: [u8; 32],
}

impl NetworkSecret {
    /// Wrap existing secret bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { inner: bytes }
    }

    /// Generate a random secret (genesis enclave only).
    pub fn generate() -> Self {
        let mut inner = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut inner);
        Self { inner }
    }

    /// Secret bytes. Do not hold on to the reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.inner
    }
}

impl std::fmt::Debug for NetworkSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NetworkSecret(***)")
    }
}

/// `SecretSealer` that ECIES-encrypts the network secret.
pub struct EciesSecretSealer {
    secret: NetworkSecret,
}

impl EciesSecretSealer {
    /// Create a sealer for the given network secret.
    pub fn new(secret: NetworkSecret) -> Self {
        Self { secret }
    }
}

impl std::fmt::Debug for EciesSecretSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EciesSecretSealer")
            .field("secret", &self.secret)
            .finish()
    }
}

#[async_trait]
impl SecretSealer for EciesSecretSealer {
    async fn encrypt_under(&self, recipient: &CompressedPublicKey) -> Result<Vec<u8>, SealError> {
        seal(self.secret.as_bytes(), recipient)
    }
}

fn seal(plaintext: &[u8], recipient: &CompressedPublicKey) -> Result<Vec<u8>, SealError> {
    let recipient = PublicKey::from_sec1_bytes(recipient.as_bytes())
        .map_err(|_| SealError::InvalidRecipientKey)?;

    let ephemeral = EphemeralSecret::random(&mut rand::thread_rng());
    let ephemeral_public = ephemeral.public_key().to_encoded_point(true);
    let shared = ephemeral.diffie_hellman(&recipient);

    let mut key = derive_key(shared.raw_secret_bytes(), ephemeral_public.as_bytes());
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| SealError::EncryptionFailed(e.to_string()))?;

    let mut sealed = Vec::with_capacity(SEALED_HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(ephemeral_public.as_bytes());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open a payload produced by [`EciesSecretSealer`] with the recipient's key.
pub fn open_sealed_secret(recipient: &k256::SecretKey, sealed: &[u8]) -> Result<Vec<u8>, SealError> {
    if sealed.len() < SEALED_HEADER_LEN {
        return Err(SealError::DecryptionFailed(format!(
            "sealed payload of {} bytes is shorter than its header",
            sealed.len()
        )));
    }

    let (ephemeral_bytes, rest) = sealed.split_at(COMPRESSED_PUBLIC_KEY_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let ephemeral = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|e| SealError::DecryptionFailed(e.to_string()))?;
    let shared = diffie_hellman(recipient.to_nonzero_scalar(), ephemeral.as_affine());

    let mut key = derive_key(shared.raw_secret_bytes(), ephemeral_bytes);
    let cipher = XChaCha20Poly1305::new((&key).into());
    key.zeroize();

    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|e| SealError::DecryptionFailed(e.to_string()))
}

fn derive_key(shared_x: &[u8], ephemeral_public: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KDF_TAG);
    hasher.update(shared_x);
    hasher.update(ephemeral_public);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> (k256::SecretKey, CompressedPublicKey) {
        let secret = k256::SecretKey::random(&mut rand::thread_rng());
        let encoded = secret.public_key().to_encoded_point(true);
        let public = CompressedPublicKey::from_slice(encoded.as_bytes()).unwrap();
        (secret, public)
    }

    #[tokio::test]
    async fn test_seal_and_open() {
        let network_secret = NetworkSecret::new([0x42; 32]);
        let sealer = EciesSecretSealer::new(network_secret.clone());
        let (secret, public) = recipient();

        let sealed = sealer.encrypt_under(&public).await.unwrap();

        // header + 32-byte secret + 16-byte tag
        assert_eq!(sealed.len(), SEALED_HEADER_LEN + 32 + 16);
        let opened = open_sealed_secret(&secret, &sealed).unwrap();
        assert_eq!(opened.as_slice(), network_secret.as_bytes());
    }

    #[tokio::test]
    async fn test_sealing_is_randomized() {
        let sealer = EciesSecretSealer::new(NetworkSecret::generate());
        let (_, public) = recipient();

        let a = sealer.encrypt_under(&public).await.unwrap();
        let b = sealer.encrypt_under(&public).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_wrong_recipient_cannot_open() {
        let sealer = EciesSecretSealer::new(NetworkSecret::generate());
        let (_, public) = recipient();
        let (other, _) = recipient();

        let sealed = sealer.encrypt_under(&public).await.unwrap();
        assert!(matches!(
            open_sealed_secret(&other, &sealed),
            Err(SealError::DecryptionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_recipient_key() {
        let sealer = EciesSecretSealer::new(NetworkSecret::generate());
        let mut bytes = [0xFFu8; COMPRESSED_PUBLIC_KEY_LEN];
        bytes[0] = 0x02;

        let result = sealer
            .encrypt_under(&CompressedPublicKey::from_bytes(bytes))
            .await;
        assert!(matches!(result, Err(SealError::InvalidRecipientKey)));
    }

    #[test]
    fn test_open_rejects_short_payload() {
        let (secret, _) = recipient();
        assert!(open_sealed_secret(&secret, &[0u8; SEALED_HEADER_LEN - 1]).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let sealer = EciesSecretSealer::new(NetworkSecret::new([0x42; 32]));
        let debug = format!("{:?}", sealer);
        assert!(debug.contains("***"));
        assert!(!debug.contains("42"));
    }
}
