//! In-Memory Identity Store Adapter
//!
//! Implements `IdentityStore` over a lock-protected map. The write lock
//! serializes concurrent writes to the same enclave id.

use crate::domain::{to_hex, Address, UncompressedPublicKey};
use crate::ports::outbound::{IdentityStore, StoreError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identity store kept in enclave memory.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    enclaves: RwLock<HashMap<Address, UncompressedPublicKey>>,
}

impl InMemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the key bound to an enclave id.
    pub fn get(&self, enclave_id: &Address) -> Option<UncompressedPublicKey> {
        self.enclaves.read().get(enclave_id).copied()
    }

    /// Number of stored bindings.
    pub fn len(&self) -> usize {
        self.enclaves.read().len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.enclaves.read().is_empty()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn store_enclave(
        &self,
        cancel: &CancellationToken,
        enclave_id: Address,
        public_key: UncompressedPublicKey,
    ) -> Result<(), StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let previous = self.enclaves.write().insert(enclave_id, public_key);
        debug!(
            enclave_id = %to_hex(&enclave_id),
            replaced = previous.is_some(),
            "[qc-18] Stored enclave key"
        );
        Ok(())
    }
}
