//! Client configuration.

use std::{path::PathBuf, time::Duration};

use pushover_listener_transport::Endpoints;
use serde::{Deserialize, Serialize};

const STORAGE_DIR_NAME: &str = "pushover-listener";

/// Reconnect backoff settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_secs: u64,
    pub max_delay_secs: u64,
    pub factor: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 10,
            max_delay_secs: 300,
            factor: 2,
        }
    }
}

impl ReconnectConfig {
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

/// Everything a `PushoverClient` needs besides credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub reconnect: ReconnectConfig,
    /// Pause between a new-message signal and the fetch, letting the
    /// provider's queue settle.
    pub settle_delay_ms: u64,
    pub startup_timeout_secs: u64,
    pub teardown_timeout_secs: u64,
    /// Also bounds the streaming connection handshake.
    pub request_timeout_secs: u64,
    /// Longest silence tolerated on the streaming connection before it is
    /// treated as dead and reconnected.
    pub stream_idle_timeout_secs: u64,
    /// Where device identities are persisted. Defaults to the platform data dir.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            reconnect: ReconnectConfig::default(),
            settle_delay_ms: 500,
            startup_timeout_secs: 30,
            teardown_timeout_secs: 10,
            request_timeout_secs: 30,
            stream_idle_timeout_secs: 90,
            storage_dir: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    #[must_use]
    pub const fn teardown_timeout(&self) -> Duration {
        Duration::from_secs(self.teardown_timeout_secs)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub const fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    /// Resolved identity storage directory.
    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(STORAGE_DIR_NAME)
        })
    }
}
