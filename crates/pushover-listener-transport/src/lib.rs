//! Transport layer for the Pushover open-client protocol.
//!
//! Provides:
//! - Endpoint configuration and response decoding
//! - `HttpProviderApi` - Login, registration and message store calls over HTTPS
//! - `WsConnector` - Streaming connection over WebSocket (feature: websocket)

pub mod http;
pub mod protocol;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use http::HttpProviderApi;
pub use protocol::Endpoints;

#[cfg(feature = "websocket")]
pub use websocket::WsConnector;
