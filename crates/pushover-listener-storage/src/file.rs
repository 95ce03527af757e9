//! Durable identity storage as one JSON record per device name.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use pushover_listener_core::{
    DeviceIdentity, DeviceName,
    traits::{IdentityStore, StorageError},
};
use serde::{Deserialize, Serialize};

/// Record format version.
const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    version: u32,
    key: String,
    data: DeviceIdentity,
}

/// File-backed storage implementation.
///
/// Each device name maps to `<dir>/<storage key>.json`. Writes go through a
/// temporary file and a rename, so a crash never leaves a half-written record.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    dir: PathBuf,
}

impl FileIdentityStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self, name: &DeviceName) -> Result<Option<DeviceIdentity>, StorageError> {
        let key = name.storage_key();
        let bytes = match tokio::fs::read(self.path_for(&key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: Record =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                key: key.clone(),
                message: e.to_string(),
            })?;
        if record.version > STORAGE_VERSION {
            return Err(StorageError::Corrupt {
                key,
                message: format!("unsupported version {}", record.version),
            });
        }
        Ok(Some(record.data))
    }

    async fn save(&self, name: &DeviceName, identity: &DeviceIdentity) -> Result<(), StorageError> {
        let key = name.storage_key();
        let record = Record {
            version: STORAGE_VERSION,
            key: key.clone(),
            data: identity.clone(),
        };
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), "Saved device identity");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn name() -> DeviceName {
        DeviceName::parse("homeassistant").unwrap()
    }

    #[tokio::test]
    async fn test_missing_record_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("nested"));

        assert_eq!(assert_ok!(store.load(&name()).await), None);
    }

    #[tokio::test]
    async fn test_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        assert_ok!(
            FileIdentityStore::new(dir.path())
                .save(&name(), &DeviceIdentity::new("dev-123"))
                .await
        );

        let reopened = FileIdentityStore::new(dir.path());
        assert_eq!(
            assert_ok!(reopened.load(&name()).await),
            Some(DeviceIdentity::new("dev-123"))
        );
        assert!(dir.path().join("pushover_listener.homeassistant.json").is_file());
        assert!(!dir.path().join("pushover_listener.homeassistant.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pushover_listener.homeassistant.json"),
            b"{not json",
        )
        .unwrap();

        let err = assert_err!(FileIdentityStore::new(dir.path()).load(&name()).await);
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_record_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path());
        assert_ok!(store.save(&name(), &DeviceIdentity::new("abc")).await);

        let raw = std::fs::read(dir.path().join("pushover_listener.homeassistant.json")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "version": 1,
                "key": "pushover_listener.homeassistant",
                "data": {"device_id": "abc"}
            })
        );
    }
}
