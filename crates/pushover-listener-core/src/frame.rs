//! Streaming connection wire format.
//!
//! After connecting the client sends one login line; from then on the server
//! only sends single-byte binary frames.

/// Why the server asked the client to drop the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReason {
    /// `R`: reconnect requested by the server.
    Reload,
    /// `E`: the server hit an error with this session.
    Error,
    /// `A`: the device logged in from another connection.
    SessionTakenOver,
}

/// A control frame from the streaming connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    /// `!`: new messages are waiting in the message store.
    NewMessages,
    /// `#`: keep-alive.
    KeepAlive,
    /// The server wants the client to reconnect.
    Reconnect(ReconnectReason),
    /// Anything else. Logged and ignored.
    Unknown(Vec<u8>),
}

impl ControlFrame {
    /// Decode a binary frame.
    #[must_use]
    pub fn parse(data: &[u8]) -> Self {
        match data {
            b"!" => Self::NewMessages,
            b"#" => Self::KeepAlive,
            b"R" => Self::Reconnect(ReconnectReason::Reload),
            b"E" => Self::Reconnect(ReconnectReason::Error),
            b"A" => Self::Reconnect(ReconnectReason::SessionTakenOver),
            other => Self::Unknown(other.to_vec()),
        }
    }
}

/// Line sent immediately after the stream opens.
#[must_use]
pub fn login_line(device_id: &str, secret: &str) -> String {
    format!("login:{device_id}:{secret}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_frames() {
        assert_eq!(ControlFrame::parse(b"!"), ControlFrame::NewMessages);
        assert_eq!(ControlFrame::parse(b"#"), ControlFrame::KeepAlive);
        assert_eq!(
            ControlFrame::parse(b"A"),
            ControlFrame::Reconnect(ReconnectReason::SessionTakenOver)
        );
    }

    #[test]
    fn test_parse_unknown_frames() {
        assert_eq!(ControlFrame::parse(b"!!"), ControlFrame::Unknown(b"!!".to_vec()));
        assert_eq!(ControlFrame::parse(b""), ControlFrame::Unknown(Vec::new()));
    }

    #[test]
    fn test_login_line() {
        assert_eq!(login_line("dev", "sec"), "login:dev:sec\n");
    }
}
