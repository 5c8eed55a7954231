//! In-memory identity storage.

use std::sync::RwLock;

use async_trait::async_trait;
use wschat_core::{Identity, IdentityStore, StorageError};

/// In-memory storage implementation.
///
/// Useful for tests and for front ends that do not persist anything.
/// Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identity: RwLock<Option<Identity>>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds an identity.
    #[must_use]
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity: RwLock::new(Some(identity)),
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load(&self) -> Result<Option<Identity>, StorageError> {
        Ok(self
            .identity
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .clone())
    }

    async fn save(&self, identity: &Identity) -> Result<(), StorageError> {
        *self
            .identity
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))? = Some(identity.clone());
        Ok(())
    }
}
