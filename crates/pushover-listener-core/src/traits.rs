//! Core traits for the provider API, identity storage and the push stream.

use async_trait::async_trait;
use thiserror::Error;

use crate::{ControlFrame, DeviceIdentity, DeviceName, Message};

/// Provider API error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider answered with `status != 1`.
    #[error("{endpoint} rejected the request: {errors}")]
    Rejected {
        endpoint: &'static str,
        errors: String,
    },
    /// Non-success HTTP status without a provider status body.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
    /// The request never got an answer.
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    /// The answer could not be understood.
    #[error("unexpected response from {endpoint}: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

impl ApiError {
    /// Whether the provider explicitly refused the request, as opposed to
    /// the request failing on the way.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Trait for the provider's request/response API.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Exchange credentials for a session secret.
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError>;

    /// Register a new open-client device and return its id.
    async fn register_device(&self, secret: &str, name: &DeviceName) -> Result<String, ApiError>;

    /// Fetch every message currently queued for the device.
    async fn fetch_messages(&self, secret: &str, device_id: &str) -> Result<Vec<Message>, ApiError>;

    /// Let the provider discard every message with id up to and including `max_id`.
    async fn delete_messages_up_to(
        &self,
        secret: &str,
        device_id: &str,
        max_id: u64,
    ) -> Result<(), ApiError>;
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt record {key}: {message}")]
    Corrupt { key: String, message: String },
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Trait for device identity persistence.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Load the identity cached for `name`, if any.
    async fn load(&self, name: &DeviceName) -> Result<Option<DeviceIdentity>, StorageError>;

    /// Persist the identity for `name`, replacing any previous one.
    async fn save(&self, name: &DeviceName, identity: &DeviceIdentity) -> Result<(), StorageError>;
}

/// Streaming connection error.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Connect failed: {0}")]
    Connect(String),
    #[error("Send failed: {0}")]
    Send(String),
    #[error("Receive failed: {0}")]
    Receive(String),
}

/// Opens streaming connections.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn PushStream>, StreamError>;
}

/// An open streaming connection.
#[async_trait]
pub trait PushStream: Send {
    /// Send one text line.
    async fn send_line(&mut self, line: &str) -> Result<(), StreamError>;

    /// Next control frame; `None` once the connection is closed.
    async fn next_frame(&mut self) -> Option<Result<ControlFrame, StreamError>>;

    /// Close the connection, ignoring errors.
    async fn close(&mut self);
}
