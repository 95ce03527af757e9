//! Device naming and identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum device name length accepted by the provider.
pub const MAX_DEVICE_NAME_LEN: usize = 25;

const STORAGE_KEY_PREFIX: &str = "pushover_listener";

/// Why a device name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidDeviceName {
    #[error("device name must be 1 to {MAX_DEVICE_NAME_LEN} characters long")]
    Length,
    #[error("device name may only contain letters, digits, '_' and '-'")]
    Characters,
}

/// Human-chosen name this client registers under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceName(String);

impl DeviceName {
    /// Validate a device name.
    ///
    /// # Errors
    /// Returns error if the name is empty, longer than 25 characters, or
    /// contains anything outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidDeviceName> {
        let raw = raw.into();
        let len = raw.chars().count();
        if len == 0 || len > MAX_DEVICE_NAME_LEN {
            return Err(InvalidDeviceName::Length);
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(InvalidDeviceName::Characters);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key the persisted identity for this name is stored under.
    ///
    /// Validated names never contain whitespace, so the name is used as-is.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{STORAGE_KEY_PREFIX}.{}", self.0)
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceName {
    type Error = InvalidDeviceName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DeviceName> for String {
    fn from(name: DeviceName) -> Self {
        name.0
    }
}

/// Provider-assigned device identifier, persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: String,
}

impl DeviceIdentity {
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }
}

/// A registered device paired with the session secret of the current login.
///
/// The secret is never persisted and is re-derived on every start.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedDevice {
    pub device_id: String,
    pub secret: String,
}

impl AuthenticatedDevice {
    #[must_use]
    pub fn new(device_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for AuthenticatedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedDevice")
            .field("device_id", &self.device_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
