//! In-memory identity storage.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use pushover_listener_core::{
    DeviceIdentity, DeviceName,
    traits::{IdentityStore, StorageError},
};

/// In-memory storage implementation.
///
/// Useful for tests and hosts that persist identities themselves.
/// Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    records: RwLock<HashMap<String, DeviceIdentity>>,
}

impl MemoryIdentityStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the record for `name`, as if the cache were deleted out-of-band.
    ///
    /// # Errors
    /// Returns error if the lock is poisoned.
    pub fn forget(&self, name: &DeviceName) -> Result<Option<DeviceIdentity>, StorageError> {
        Ok(self
            .records
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .remove(&name.storage_key()))
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load(&self, name: &DeviceName) -> Result<Option<DeviceIdentity>, StorageError> {
        Ok(self
            .records
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .get(&name.storage_key())
            .cloned())
    }

    async fn save(&self, name: &DeviceName, identity: &DeviceIdentity) -> Result<(), StorageError> {
        self.records
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?
            .insert(name.storage_key(), identity.clone());
        Ok(())
    }
}
