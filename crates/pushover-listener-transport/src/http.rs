//! Provider API over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use pushover_listener_core::{
    DeviceName, Message,
    traits::{ApiError, ProviderApi},
};
use serde_json::Value;

use crate::protocol::{
    ACKNOWLEDGE, Endpoints, FETCH, LOGIN, OPEN_CLIENT_OS, REGISTER, decode_messages,
    require_success, string_field,
};

/// `ProviderApi` backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpProviderApi {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpProviderApi {
    /// Create a client whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot be initialised.
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoints))
    }

    /// Use an existing client, e.g. one shared with the host.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Send a request and decode its JSON body.
    ///
    /// The provider reports failures in the body, often alongside a 4xx
    /// status, so a body with a `status` field is always returned for
    /// interpretation. Anything else with a non-success status is an HTTP
    /// error.
    async fn send(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport {
            endpoint,
            message: e.to_string(),
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ApiError::Transport {
            endpoint,
            message: e.to_string(),
        })?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) if body.get("status").is_some() => Ok(body),
            _ if !status.is_success() => Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
            }),
            Ok(body) => Ok(body),
            Err(e) => Err(ApiError::Decode {
                endpoint,
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ProviderApi for HttpProviderApi {
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let request = self
            .client
            .post(self.endpoints.login_url())
            .form(&[("email", email), ("password", password)]);
        let body = require_success(LOGIN, self.send(LOGIN, request).await?)?;
        string_field(LOGIN, &body, "secret")
    }

    async fn register_device(&self, secret: &str, name: &DeviceName) -> Result<String, ApiError> {
        let request = self.client.post(self.endpoints.devices_url()).form(&[
            ("secret", secret),
            ("name", name.as_str()),
            ("os", OPEN_CLIENT_OS),
        ]);
        let body = require_success(REGISTER, self.send(REGISTER, request).await?)?;
        string_field(REGISTER, &body, "id")
    }

    async fn fetch_messages(
        &self,
        secret: &str,
        device_id: &str,
    ) -> Result<Vec<Message>, ApiError> {
        let request = self
            .client
            .get(self.endpoints.messages_url())
            .query(&[("secret", secret), ("device_id", device_id)]);
        let body = require_success(FETCH, self.send(FETCH, request).await?)?;
        decode_messages(&body)
    }

    async fn delete_messages_up_to(
        &self,
        secret: &str,
        device_id: &str,
        max_id: u64,
    ) -> Result<(), ApiError> {
        let max_id = max_id.to_string();
        let request = self
            .client
            .post(self.endpoints.acknowledge_url(device_id))
            .form(&[("secret", secret), ("message", max_id.as_str())]);
        require_success(ACKNOWLEDGE, self.send(ACKNOWLEDGE, request).await?)?;
        Ok(())
    }
}
