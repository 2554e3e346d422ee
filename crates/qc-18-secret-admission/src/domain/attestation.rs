//! # Attestation Blob Codec
//!
//! Encodes and decodes [`AttestationReport`] blobs carried inside registry
//! events, and checks that a verified quote binds the key the report presents.
//!
//! The encoding is bincode with fixed-width integers and no trailing bytes, so
//! decode followed by encode reproduces the input exactly.

use super::entities::{to_hex, AttestationReport, VerifiedIdentity};
use crate::error::{AdmissionError, AdmissionResult};
use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

/// Upper bound on any blob this subsystem decodes (quotes are a few KiB).
pub const MAX_WIRE_SIZE: u64 = 1 << 20;

/// Shared bincode configuration for every blob on the registry wire.
pub(crate) fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_WIRE_SIZE)
        .reject_trailing_bytes()
}

pub(crate) fn wire_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    wire_options().serialize(value)
}

pub(crate) fn wire_decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, bincode::Error> {
    wire_options().deserialize(bytes)
}

/// Encode an attestation report into its wire blob.
pub fn encode_attestation(report: &AttestationReport) -> AdmissionResult<Vec<u8>> {
    wire_encode(report).map_err(|e| AdmissionError::Decode(e.to_string()))
}

/// Decode an attestation blob.
///
/// Fails on truncated or oversized input, trailing bytes, non-UTF-8 host
/// addresses and public keys without a compressed SEC1 prefix.
pub fn decode_attestation(blob: &[u8]) -> AdmissionResult<AttestationReport> {
    let report: AttestationReport =
        wire_decode(blob).map_err(|e| AdmissionError::Decode(e.to_string()))?;

    if !report.public_key.has_valid_prefix() {
        return Err(AdmissionError::Decode(format!(
            "public key prefix 0x{:02x} is not a compressed SEC1 tag",
            report.public_key.as_bytes()[0]
        )));
    }

    Ok(report)
}

/// Check that the verified quote names the public key the report presents.
///
/// Fails if and only if the keys differ.
pub fn verify_identity(
    verified: &VerifiedIdentity,
    report: &AttestationReport,
) -> AdmissionResult<()> {
    if verified.public_key != report.public_key {
        return Err(AdmissionError::IdentityMismatch {
            reported: to_hex(report.public_key.as_bytes()),
            attested: to_hex(verified.public_key.as_bytes()),
        });
    }
    Ok(())
}
