//! Core types for the Pushover open-client listener.
//!
//! This crate provides the fundamental building blocks:
//! - `DeviceName` / `DeviceIdentity` - Validated device naming and the persisted identity
//! - `Message` / `MessageEvent` - Provider messages and their enriched, emitted form
//! - `ControlFrame` - Single-byte signals from the streaming connection
//! - `TriggerKind` - Filters over emitted events
//! - Provider, storage, stream and sink traits

pub mod device;
pub mod frame;
pub mod message;
pub mod sink;
pub mod traits;
pub mod trigger;

pub use device::{AuthenticatedDevice, DeviceIdentity, DeviceName, InvalidDeviceName};
pub use frame::{ControlFrame, ReconnectReason};
pub use message::{EVENT_TYPE, Message, MessageEvent, MessageOrigin};
pub use sink::{EventSink, SinkSlot};
pub use traits::{IdentityStore, ProviderApi, PushStream, StreamConnector};
pub use trigger::{Level, TriggerKind};
