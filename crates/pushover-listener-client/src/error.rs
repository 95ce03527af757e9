//! Client error taxonomy.

use std::time::Duration;

use pushover_listener_core::{InvalidDeviceName, traits::ApiError};
use thiserror::Error;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials were refused. Retrying will not help.
    Auth,
    /// The provider refused to register the device.
    Registration,
    /// The provider could not be reached or answered nonsense.
    Transport,
    /// Start-up did not finish in time.
    Timeout,
    /// Invalid configuration or client setup.
    Config,
    /// The operation needs a started client.
    NotStarted,
    /// The listener was cancelled by `stop()`.
    Cancelled,
}

/// Client error.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Authentication failed for {email}: {source}")]
    AuthFailure {
        email: String,
        #[source]
        source: ApiError,
    },
    #[error("Device registration failed for {device_name}: {source}")]
    RegistrationFailure {
        device_name: String,
        #[source]
        source: ApiError,
    },
    #[error("Could not reach the provider: {0}")]
    Transport(#[from] ApiError),
    #[error("Client start-up timed out after {0:?}")]
    StartupTimeout(Duration),
    #[error("Invalid device name: {0}")]
    InvalidDeviceName(#[from] InvalidDeviceName),
    #[error("Client setup failed: {0}")]
    Setup(String),
    #[error("Client has not been started")]
    NotStarted,
    #[error("Listener cancelled")]
    Cancelled,
}

impl ClientError {
    /// Classify a login failure: explicit refusals are auth errors, anything
    /// else means the provider could not be reached.
    pub(crate) fn login(email: &str, source: ApiError) -> Self {
        if source.is_rejection() {
            Self::AuthFailure {
                email: email.to_string(),
                source,
            }
        } else {
            Self::Transport(source)
        }
    }

    /// Classify a registration failure the same way.
    pub(crate) fn registration(device_name: &str, source: ApiError) -> Self {
        if source.is_rejection() {
            Self::RegistrationFailure {
                device_name: device_name.to_string(),
                source,
            }
        } else {
            Self::Transport(source)
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthFailure { .. } => ErrorKind::Auth,
            Self::RegistrationFailure { .. } => ErrorKind::Registration,
            Self::Transport(_) => ErrorKind::Transport,
            Self::StartupTimeout(_) => ErrorKind::Timeout,
            Self::InvalidDeviceName(_) | Self::Setup(_) => ErrorKind::Config,
            Self::NotStarted => ErrorKind::NotStarted,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether trying again later may succeed without the user changing anything.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Timeout)
    }
}
