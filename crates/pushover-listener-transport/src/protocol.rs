//! Provider endpoints and response decoding.

use pushover_listener_core::{Message, traits::ApiError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Platform code sent when registering an open-client device.
pub const OPEN_CLIENT_OS: &str = "O";

pub(crate) const LOGIN: &str = "login";
pub(crate) const REGISTER: &str = "device registration";
pub(crate) const FETCH: &str = "message fetch";
pub(crate) const ACKNOWLEDGE: &str = "message acknowledge";

/// Where the provider lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Base of the HTTPS API, without trailing slash.
    pub api_base: String,
    /// Streaming connection URL.
    pub stream_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: "https://api.pushover.net".to_string(),
            stream_url: "wss://client.pushover.net/push".to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints with a different API base and the default stream URL.
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }

    fn base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    #[must_use]
    pub fn login_url(&self) -> String {
        format!("{}/1/users/login.json", self.base())
    }

    #[must_use]
    pub fn devices_url(&self) -> String {
        format!("{}/1/devices.json", self.base())
    }

    #[must_use]
    pub fn messages_url(&self) -> String {
        format!("{}/1/messages.json", self.base())
    }

    #[must_use]
    pub fn acknowledge_url(&self, device_id: &str) -> String {
        format!(
            "{}/1/devices/{device_id}/update_highest_message.json",
            self.base()
        )
    }
}

/// Interpret a decoded body: `status == 1` is success.
pub(crate) fn require_success(endpoint: &'static str, body: Value) -> Result<Value, ApiError> {
    if body.get("status").and_then(Value::as_i64) == Some(1) {
        return Ok(body);
    }
    let errors = match body.get("errors") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|e| e.as_str().map_or_else(|| e.to_string(), str::to_string))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.to_string(),
    };
    Err(ApiError::Rejected { endpoint, errors })
}

/// Pull a string field out of a successful body.
pub(crate) fn string_field(
    endpoint: &'static str,
    body: &Value,
    field: &str,
) -> Result<String, ApiError> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::Decode {
            endpoint,
            message: format!("missing `{field}`"),
        })
}

/// Decode the `messages` array.
///
/// A single record without a usable id fails the whole batch: acknowledging
/// the rest would also delete the record that was never delivered.
pub(crate) fn decode_messages(body: &Value) -> Result<Vec<Message>, ApiError> {
    let Some(Value::Array(records)) = body.get("messages") else {
        return Ok(Vec::new());
    };
    records
        .iter()
        .map(|record| {
            serde_json::from_value::<Message>(record.clone()).map_err(|e| ApiError::Decode {
                endpoint: FETCH,
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_urls() {
        let endpoints = Endpoints::with_api_base("http://localhost:8080/");
        assert_eq!(endpoints.login_url(), "http://localhost:8080/1/users/login.json");
        assert_eq!(
            endpoints.acknowledge_url("dev"),
            "http://localhost:8080/1/devices/dev/update_highest_message.json"
        );
        assert_eq!(endpoints.stream_url, "wss://client.pushover.net/push");
    }

    #[test]
    fn test_require_success() {
        assert!(require_success(LOGIN, json!({"status": 1, "secret": "s"})).is_ok());

        let err = require_success(
            LOGIN,
            json!({"status": 0, "errors": ["invalid email", "bad password"]}),
        )
        .unwrap_err();
        assert!(err.is_rejection());
        assert!(err.to_string().contains("invalid email; bad password"));
    }

    #[test]
    fn test_decode_messages() {
        let body = json!({
            "status": 1,
            "messages": [{"id": "5", "message": "a"}, {"id": 6, "message": "b"}]
        });
        let ids: Vec<u64> = decode_messages(&body).unwrap().iter().map(Message::id).collect();
        assert_eq!(ids, vec![5, 6]);
        assert!(decode_messages(&json!({"status": 1})).unwrap().is_empty());
    }

    #[test]
    fn test_one_bad_record_fails_the_batch() {
        let body = json!({
            "status": 1,
            "messages": [
                {"id": "5", "message": "a"},
                {"message": "no id"},
                {"id": 6, "message": "b"}
            ]
        });
        let err = decode_messages(&body).unwrap_err();
        assert!(matches!(err, ApiError::Decode { endpoint: FETCH, .. }), "{err}");
    }
}
