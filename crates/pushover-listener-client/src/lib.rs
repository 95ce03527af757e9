//! Session lifecycle and message delivery for the Pushover open-client protocol.
//!
//! Provides:
//! - `PushoverClient` - `start` / `listen` / `stop` for one account and device
//! - `MessageChannel` - Fetch, emit and acknowledge with at-least-once delivery
//! - `StreamSupervisor` - Streaming connection with exponential-backoff reconnects
//! - `ClientRegistry` - Owns running clients keyed by host entry id

pub mod backoff;
pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod supervisor;

#[cfg(test)]
mod test_support;

pub use backoff::ReconnectState;
pub use channel::MessageChannel;
pub use client::{ClientParts, Credentials, PushoverClient, StopOutcome};
pub use config::{ClientConfig, ReconnectConfig};
pub use error::{ClientError, ErrorKind};
pub use registry::ClientRegistry;
pub use supervisor::{RunControl, StreamSupervisor, SupervisorState};
