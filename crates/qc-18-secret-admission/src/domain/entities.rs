//! # Domain Entities
//!
//! Core data structures for secret admission.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::HashMap;
use std::fmt;

/// Ethereum-style address (last 20 bytes of keccak256(pubkey)).
pub type Address = [u8; 20];

/// 32-byte hash.
pub type Hash = [u8; 32];

/// SEC1 compressed secp256k1 key length.
pub const COMPRESSED_PUBLIC_KEY_LEN: usize = 33;

/// Uncompressed X || Y length (no `0x04` prefix).
pub const UNCOMPRESSED_PUBLIC_KEY_LEN: usize = 64;

/// Recoverable signature length (r || s || v).
pub const SIGNATURE_LEN: usize = 65;

/// Render bytes as `0x`-prefixed hex for logs and error messages.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// =============================================================================
// Layer-1 input
// =============================================================================

/// Kinds of registry events the processor consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Genesis enclave publishing its attestation
    InitializeSecret,
    /// New enclave asking for the network secret
    RequestSecret,
}

/// Header of the layer-1 block the events came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block height
    pub number: u64,
    /// Block hash
    pub hash: Hash,
}

/// A single registry transaction observed on layer 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    /// Raw transaction calldata
    pub transaction: Vec<u8>,
    /// Transaction hash
    pub tx_hash: Hash,
}

impl EventRecord {
    /// Create a record from calldata and its transaction hash.
    pub fn new(transaction: Vec<u8>, tx_hash: Hash) -> Self {
        Self {
            transaction,
            tx_hash,
        }
    }
}

/// Immutable bundle of classified layer-1 events for one block.
#[derive(Clone, Debug, Default)]
pub struct ProcessedBundle {
    /// Originating block header
    pub block_header: BlockHeader,
    events: HashMap<EventKind, Vec<EventRecord>>,
}

impl ProcessedBundle {
    /// Create an empty bundle for a block.
    pub fn new(block_header: BlockHeader) -> Self {
        Self {
            block_header,
            events: HashMap::new(),
        }
    }

    /// Builder-style method to append an event of the given kind.
    pub fn with_event(mut self, kind: EventKind, record: EventRecord) -> Self {
        self.push_event(kind, record);
        self
    }

    /// Append an event, preserving list order within its kind.
    pub fn push_event(&mut self, kind: EventKind, record: EventRecord) {
        self.events.entry(kind).or_default().push(record);
    }

    /// Events of one kind in their original order; empty when absent.
    pub fn events_of(&self, kind: EventKind) -> &[EventRecord] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the bundle carries no events at all.
    pub fn is_empty(&self) -> bool {
        self.events.values().all(Vec::is_empty)
    }
}

// =============================================================================
// Registry events
// =============================================================================

/// Genesis enclave's attestation, emitted by the registry contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeSecretEvent {
    /// Encoded [`AttestationReport`]
    pub attestation: Vec<u8>,
}

/// Admission request from a joining enclave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSecretEvent {
    /// Encoded [`AttestationReport`]
    pub attestation: Vec<u8>,
}

/// Decoded registry event. Closed set: anything else fails decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypedEvent {
    /// `initializeNetworkSecret`
    Initialize(InitializeSecretEvent),
    /// `requestNetworkSecret`
    Request(RequestSecretEvent),
}

// =============================================================================
// Keys and signatures
// =============================================================================

/// SEC1 compressed secp256k1 public key (wire format).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompressedPublicKey(#[serde_as(as = "Bytes")] [u8; COMPRESSED_PUBLIC_KEY_LEN]);

impl CompressedPublicKey {
    /// Wrap raw compressed bytes. Curve membership is checked on decompression.
    pub fn from_bytes(bytes: [u8; COMPRESSED_PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy from a slice of exactly 33 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; COMPRESSED_PUBLIC_KEY_LEN] = slice.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_LEN] {
        &self.0
    }

    /// True when the prefix byte is a valid SEC1 compressed tag.
    pub fn has_valid_prefix(&self) -> bool {
        matches!(self.0[0], 0x02 | 0x03)
    }
}

impl fmt::Debug for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPublicKey({})", to_hex(&self.0))
    }
}

/// Uncompressed secp256k1 public key as X || Y (storage format).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UncompressedPublicKey(#[serde_as(as = "Bytes")] [u8; UNCOMPRESSED_PUBLIC_KEY_LEN]);

impl UncompressedPublicKey {
    /// Wrap raw X || Y bytes.
    pub fn from_bytes(bytes: [u8; UNCOMPRESSED_PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; UNCOMPRESSED_PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for UncompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UncompressedPublicKey({})", to_hex(&self.0))
    }
}

/// Recoverable ECDSA signature: r (32) || s (32) || v (1), v in {0, 1}.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature(#[serde_as(as = "Bytes")] [u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// R component.
    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    /// S component.
    pub fn s(&self) -> &[u8] {
        &self.0[32..64]
    }

    /// Recovery id.
    pub fn v(&self) -> u8 {
        self.0[64]
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", to_hex(&self.0))
    }
}

// =============================================================================
// Attestation
// =============================================================================

/// TEE attestation report as carried inside registry events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationReport {
    /// Address derived from the enclave's attested signing key
    pub enclave_id: Address,
    /// Where the enclave's host can be reached
    pub host_address: String,
    /// Key the enclave wants the secret sealed to
    pub public_key: CompressedPublicKey,
    /// Verifier-defined body (quote, report data, ...)
    pub report: Vec<u8>,
}

/// Identity bound by a verified TEE quote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Enclave id named by the quote
    pub enclave_id: Address,
    /// Public key named by the quote
    pub public_key: CompressedPublicKey,
}

// =============================================================================
// Output
// =============================================================================

/// Signed, sealed copy of the network secret for one admitted enclave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretResponse {
    /// Network secret sealed under the requester's key
    pub sealed_secret: Vec<u8>,
    /// Enclave that asked for the secret
    pub requester_id: Address,
    /// This enclave
    pub attester_id: Address,
    /// Requester's host address, copied from its report
    pub host_address: String,
    /// Signature over the response hash
    pub signature: RecoverableSignature,
}

/// Result of one bundle pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdmissionOutcome {
    /// Responses to publish, in event order
    pub responses: Vec<SecretResponse>,
    /// Whether the host cancelled the pass before it finished
    pub cancelled: bool,
}
