//! Provider messages and the enriched events emitted for them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Event type every delivered message is emitted under.
pub const EVENT_TYPE: &str = "pushover_event";

const FALLBACK_SUMMARY: &str = "New Message";

/// Error building a [`Message`] from a provider record.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message record has no id")]
    MissingId,
    #[error("message id is not an unsigned integer: {0}")]
    InvalidId(Value),
}

/// A message as returned by the provider's message store.
///
/// The provider record is kept verbatim; `id` is parsed out of it because
/// acknowledgement depends on it. The provider sends ids as either strings
/// or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Message {
    id: u64,
    fields: Map<String, Value>,
}

impl Message {
    /// Per-device message id, increasing with arrival.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// Body text.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.fields.get("message").and_then(Value::as_str)
    }

    /// Raw provider record.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Build the flat mapping handed to event sinks.
    ///
    /// Order of application, later writes winning: the provider record, then
    /// `user_email` and `device_name`, then `key=value` lines from the body.
    #[must_use]
    pub fn enrich(&self, origin: &MessageOrigin) -> Map<String, Value> {
        let mut enriched = self.fields.clone();
        enriched.insert(
            "user_email".to_string(),
            Value::String(origin.user_email.clone()),
        );
        enriched.insert(
            "device_name".to_string(),
            Value::String(origin.device_name.clone()),
        );
        if let Some(body) = self.body() {
            for (key, value) in embedded_fields(body) {
                enriched.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        enriched
    }
}

impl TryFrom<Map<String, Value>> for Message {
    type Error = MessageError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let raw = fields.get("id").ok_or(MessageError::MissingId)?;
        let id = match raw {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| MessageError::InvalidId(raw.clone()))?;
        Ok(Self { id, fields })
    }
}

impl From<Message> for Map<String, Value> {
    fn from(message: Message) -> Self {
        message.fields
    }
}

/// Parse `key=value` lines out of a message body.
///
/// Whitespace and trailing `&` are stripped from both sides; lines without
/// `=` or with an empty key are skipped. Only the first `=` splits.
pub fn embedded_fields(body: &str) -> impl Iterator<Item = (&str, &str)> {
    body.lines().filter_map(|line| {
        let (key, value) = line.split_once('=')?;
        let key = clean_token(key);
        if key.is_empty() {
            return None;
        }
        Some((key, clean_token(value)))
    })
}

fn clean_token(token: &str) -> &str {
    token
        .trim()
        .trim_end_matches(|c: char| c == '&' || c.is_whitespace())
}

/// Session fields stamped onto every emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOrigin {
    pub user_email: String,
    pub device_name: String,
}

impl MessageOrigin {
    #[must_use]
    pub fn new(user_email: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            user_email: user_email.into(),
            device_name: device_name.into(),
        }
    }
}

/// One delivered message, as seen by event sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEvent {
    pub event_type: &'static str,
    pub data: Map<String, Value>,
}

impl MessageEvent {
    #[must_use]
    pub fn new(message: &Message, origin: &MessageOrigin) -> Self {
        Self {
            event_type: EVENT_TYPE,
            data: message.enrich(origin),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Short label for the message: its title, else the sending app, else a
    /// generic placeholder.
    #[must_use]
    pub fn summary(&self) -> &str {
        ["title", "app"]
            .iter()
            .find_map(|key| self.data.get(*key).and_then(Value::as_str))
            .unwrap_or(FALLBACK_SUMMARY)
    }
}
