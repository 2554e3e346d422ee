//! Mock Attestation Verifier
//!
//! Non-hardware `AttestationVerifier` for development networks and tests.
//! The report body is read as raw TEE report data:
//!
//! ```text
//! public_key (33) || enclave_id (20) || zero padding (11)
//! ```
//!
//! No quote signature is checked. Never deploy this outside a simulation.

use crate::domain::{
    Address, AttestationReport, CompressedPublicKey, VerifiedIdentity, COMPRESSED_PUBLIC_KEY_LEN,
};
use crate::ports::outbound::{AttestationVerifier, VerifierError};
use async_trait::async_trait;
use tracing::warn;

/// Length of the report data body the mock verifier accepts.
pub const REPORT_DATA_LEN: usize = 64;

const ENCLAVE_ID_END: usize = COMPRESSED_PUBLIC_KEY_LEN + 20;

/// Build a report body binding `public_key` and `enclave_id`.
pub fn mock_report_body(enclave_id: &Address, public_key: &CompressedPublicKey) -> Vec<u8> {
    let mut body = vec![0u8; REPORT_DATA_LEN];
    body[..COMPRESSED_PUBLIC_KEY_LEN].copy_from_slice(public_key.as_bytes());
    body[COMPRESSED_PUBLIC_KEY_LEN..ENCLAVE_ID_END].copy_from_slice(enclave_id);
    body
}

/// Verifier that trusts the report data as-is.
#[derive(Debug, Default)]
pub struct MockAttestationVerifier;

impl MockAttestationVerifier {
    /// Create a mock verifier. Logs a warning once per instance.
    pub fn new() -> Self {
        warn!("[qc-18] Using mock attestation verifier; quotes are not checked");
        Self
    }
}

#[async_trait]
impl AttestationVerifier for MockAttestationVerifier {
    async fn verify(&self, report: &AttestationReport) -> Result<VerifiedIdentity, VerifierError> {
        let body = &report.report;
        if body.len() != REPORT_DATA_LEN {
            return Err(VerifierError::MalformedReport(format!(
                "report data must be {} bytes, got {}",
                REPORT_DATA_LEN,
                body.len()
            )));
        }

        if body[ENCLAVE_ID_END..].iter().any(|b| *b != 0) {
            return Err(VerifierError::Rejected(
                "report data padding is not zero".to_string(),
            ));
        }

        let public_key = CompressedPublicKey::from_slice(&body[..COMPRESSED_PUBLIC_KEY_LEN])
            .ok_or_else(|| VerifierError::MalformedReport("public key slice".to_string()))?;
        let mut enclave_id = [0u8; 20];
        enclave_id.copy_from_slice(&body[COMPRESSED_PUBLIC_KEY_LEN..ENCLAVE_ID_END]);

        Ok(VerifiedIdentity {
            enclave_id,
            public_key,
        })
    }
}
