//! Streaming connection over WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use pushover_listener_core::{
    ControlFrame,
    traits::{PushStream, StreamConnector, StreamError},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// The provider sends keep-alives well within this window.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Opens WebSocket connections to the provider's push endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl WsConnector {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Bound the TCP/TLS/WebSocket handshake by `connect` and the silence
    /// between two frames by `idle`.
    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, idle: Duration) -> Self {
        self.connect_timeout = connect;
        self.idle_timeout = idle;
        self
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn PushStream>, StreamError> {
        tracing::debug!("Connecting to {}", self.url);
        let handshake = connect_async(self.url.as_str());
        let (socket, _) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| {
                let timeout = self.connect_timeout;
                StreamError::Connect(format!("handshake timed out after {timeout:?}"))
            })?
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        Ok(Box::new(WsPushStream {
            socket,
            idle_timeout: self.idle_timeout,
        }))
    }
}

/// An open WebSocket connection.
pub struct WsPushStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    idle_timeout: Duration,
}

#[async_trait]
impl PushStream for WsPushStream {
    async fn send_line(&mut self, line: &str) -> Result<(), StreamError> {
        self.socket
            .send(Message::Text(line.to_string()))
            .await
            .map_err(|e| StreamError::Send(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<ControlFrame, StreamError>> {
        loop {
            let Ok(next) = tokio::time::timeout(self.idle_timeout, self.socket.next()).await else {
                return Some(Err(StreamError::Receive(format!(
                    "no frame within {:?}",
                    self.idle_timeout
                ))));
            };
            match next? {
                Ok(Message::Binary(data)) => {
                    tracing::debug!("WebSocket binary frame received: {data:?}");
                    return Some(Ok(ControlFrame::parse(&data)));
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!("WebSocket closed by server: {frame:?}");
                    return None;
                }
                Ok(Message::Text(text)) => {
                    tracing::debug!("Ignoring text frame: {text}");
                }
                // Pings are answered by tungstenite on the next read or write.
                Ok(_) => {}
                Err(e) => return Some(Err(StreamError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            tracing::debug!("WebSocket close failed: {e}");
        }
    }
}
