//! Secret admission configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use qc_18_secret_admission::domain::AdmissionConfig;
//!
//! let config = AdmissionConfig::from_json(
//!     r#"{"enclave_id": "0x1111111111111111111111111111111111111111", "l1_chain_id": 443}"#,
//! )
//! .expect("Valid config");
//! ```

use super::entities::Address;
use crate::error::{AdmissionError, AdmissionResult};
use serde::{Deserialize, Serialize};

/// Identity of the local enclave and the chain it attests for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Local enclave id, written into every response as the attester
    #[serde(with = "hex_address")]
    pub enclave_id: Address,
    /// Layer-1 chain id, part of the signed response domain
    pub l1_chain_id: i64,
}

impl AdmissionConfig {
    /// Create a new configuration with validation
    pub fn new(enclave_id: Address, l1_chain_id: i64) -> AdmissionResult<Self> {
        let config = Self {
            enclave_id,
            l1_chain_id,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(raw: &str) -> AdmissionResult<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| AdmissionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> AdmissionResult<()> {
        if self.enclave_id == [0u8; 20] {
            return Err(AdmissionError::Config(
                "enclave_id cannot be the zero address".to_string(),
            ));
        }

        // Chain ids are positive on every EVM network
        if self.l1_chain_id <= 0 {
            return Err(AdmissionError::Config(format!(
                "l1_chain_id must be positive, got {}",
                self.l1_chain_id
            )));
        }

        Ok(())
    }

    /// Builder-style method to set the enclave id
    pub fn with_enclave_id(mut self, enclave_id: Address) -> Self {
        self.enclave_id = enclave_id;
        self
    }

    /// Builder-style method to set the layer-1 chain id
    pub fn with_l1_chain_id(mut self, l1_chain_id: i64) -> Self {
        self.l1_chain_id = l1_chain_id;
        self
    }
}

/// `0x`-prefixed hex (de)serialization for addresses.
mod hex_address {
    use super::Address;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(address)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let digits = raw.strip_prefix("0x").unwrap_or(&raw);
        let bytes = hex::decode(digits).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| D::Error::custom(format!("expected 20 bytes, got {}", b.len())))
    }
}
