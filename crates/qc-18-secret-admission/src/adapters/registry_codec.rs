//! # Registry Calldata Codec
//!
//! Decodes enclave registry transactions:
//!
//! ```text
//! calldata = selector (4) || bincode(event)
//! selector = keccak256(signature)[..4]
//! ```
//!
//! Only the two admission functions are recognised. Any other selector fails
//! to decode and the processor skips the transaction.

use crate::domain::attestation::{wire_decode, wire_encode};
use crate::domain::{
    keccak256, to_hex, Address, InitializeSecretEvent, RequestSecretEvent, TypedEvent,
};
use crate::ports::outbound::{CodecError, RegistryCodec};
use async_trait::async_trait;

/// Registry function emitted by the genesis enclave.
pub const INITIALIZE_SECRET_SIGNATURE: &str = "initializeNetworkSecret(bytes)";

/// Registry function called by joining enclaves.
pub const REQUEST_SECRET_SIGNATURE: &str = "requestNetworkSecret(bytes)";

const SELECTOR_LEN: usize = 4;

fn selector(signature: &str) -> [u8; SELECTOR_LEN] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `RegistryCodec` for one deployed registry contract.
#[derive(Debug, Clone)]
pub struct SelectorRegistryCodec {
    registry_address: Address,
    initialize_selector: [u8; SELECTOR_LEN],
    request_selector: [u8; SELECTOR_LEN],
}

impl SelectorRegistryCodec {
    /// Create a codec for the registry deployed at `registry_address`.
    pub fn new(registry_address: Address) -> Self {
        Self {
            registry_address,
            initialize_selector: selector(INITIALIZE_SECRET_SIGNATURE),
            request_selector: selector(REQUEST_SECRET_SIGNATURE),
        }
    }

    /// Encode an event as registry calldata.
    pub fn encode_event(&self, event: &TypedEvent) -> Result<Vec<u8>, CodecError> {
        let (selector, payload) = match event {
            TypedEvent::Initialize(inner) => (self.initialize_selector, wire_encode(inner)),
            TypedEvent::Request(inner) => (self.request_selector, wire_encode(inner)),
        };
        let payload = payload.map_err(|e| CodecError::Malformed(e.to_string()))?;

        let mut calldata = Vec::with_capacity(SELECTOR_LEN + payload.len());
        calldata.extend_from_slice(&selector);
        calldata.extend_from_slice(&payload);
        Ok(calldata)
    }

    fn decode_sync(&self, transaction: &[u8]) -> Result<TypedEvent, CodecError> {
        if transaction.len() < SELECTOR_LEN {
            return Err(CodecError::TooShort(transaction.len()));
        }
        let (selector, payload) = transaction.split_at(SELECTOR_LEN);

        if selector == self.initialize_selector {
            wire_decode::<InitializeSecretEvent>(payload)
                .map(TypedEvent::Initialize)
                .map_err(|e| CodecError::Malformed(e.to_string()))
        } else if selector == self.request_selector {
            wire_decode::<RequestSecretEvent>(payload)
                .map(TypedEvent::Request)
                .map_err(|e| CodecError::Malformed(e.to_string()))
        } else {
            Err(CodecError::UnknownSelector(to_hex(selector)))
        }
    }
}

#[async_trait]
impl RegistryCodec for SelectorRegistryCodec {
    async fn decode(&self, transaction: &[u8]) -> Result<TypedEvent, CodecError> {
        self.decode_sync(transaction)
    }

    fn registry_address(&self) -> Address {
        self.registry_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SelectorRegistryCodec {
        SelectorRegistryCodec::new([0x0F; 20])
    }

    #[tokio::test]
    async fn test_decode_request() {
        let event = TypedEvent::Request(RequestSecretEvent {
            attestation: vec![1, 2, 3],
        });
        let calldata = codec().encode_event(&event).unwrap();

        assert_eq!(&calldata[..4], &selector(REQUEST_SECRET_SIGNATURE));
        assert_eq!(codec().decode(&calldata).await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_decode_initialize() {
        let event = TypedEvent::Initialize(InitializeSecretEvent {
            attestation: vec![9; 16],
        });
        let calldata = codec().encode_event(&event).unwrap();
        assert_eq!(codec().decode(&calldata).await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_unknown_selector() {
        let result = codec().decode(&[0xde, 0xad, 0xbe, 0xef, 0x00]).await;
        assert!(matches!(result, Err(CodecError::UnknownSelector(s)) if s == "0xdeadbeef"));
    }

    #[tokio::test]
    async fn test_too_short() {
        let result = codec().decode(&[0x01, 0x02]).await;
        assert!(matches!(result, Err(CodecError::TooShort(2))));
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let event = TypedEvent::Request(RequestSecretEvent {
            attestation: vec![1, 2, 3],
        });
        let calldata = codec().encode_event(&event).unwrap();
        let result = codec().decode(&calldata[..calldata.len() - 1]).await;
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_selectors_differ() {
        assert_ne!(
            selector(INITIALIZE_SECRET_SIGNATURE),
            selector(REQUEST_SECRET_SIGNATURE)
        );
        assert_eq!(codec().registry_address(), [0x0F; 20]);
    }
}
