//! Client facade: `start`, `listen`, `stop`.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use pushover_listener_core::{
    AuthenticatedDevice, DeviceIdentity, DeviceName, EventSink, MessageOrigin,
    traits::{IdentityStore, ProviderApi, StreamConnector},
};
use pushover_listener_storage::FileIdentityStore;
use pushover_listener_transport::{HttpProviderApi, WsConnector};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    ClientConfig, ClientError, MessageChannel, ReconnectState, RunControl, StreamSupervisor,
    SupervisorState,
};

/// Account credentials and the device name to listen as.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub device_name: DeviceName,
}

impl Credentials {
    /// # Errors
    /// Returns error if the device name is invalid.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        device_name: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            email: email.into(),
            password: password.into(),
            device_name: DeviceName::parse(device_name)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("device_name", &self.device_name)
            .finish()
    }
}

/// Collaborators a client talks to.
pub struct ClientParts {
    pub api: Arc<dyn ProviderApi>,
    pub store: Arc<dyn IdentityStore>,
    pub connector: Arc<dyn StreamConnector>,
}

impl ClientParts {
    /// HTTPS API, WebSocket stream and file-backed identity store, as configured.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api = HttpProviderApi::new(config.endpoints.clone(), config.request_timeout())
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        let connector = WsConnector::new(config.endpoints.stream_url.clone())
            .with_timeouts(config.request_timeout(), config.stream_idle_timeout());
        Ok(Self {
            api: Arc::new(api),
            store: Arc::new(FileIdentityStore::new(config.storage_dir())),
            connector: Arc::new(connector),
        })
    }
}

/// How `stop()` finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The spawned listener ended within the teardown timeout.
    Stopped,
    /// No spawned listener; a `listen()` driven by the caller has been signalled.
    Signalled,
    /// The listener did not end in time and was aborted.
    TimedOut,
}

/// One account, one device, one streaming connection.
pub struct PushoverClient {
    config: ClientConfig,
    credentials: Credentials,
    api: Arc<dyn ProviderApi>,
    store: Arc<dyn IdentityStore>,
    connector: Arc<dyn StreamConnector>,
    channel: Arc<MessageChannel>,
    control: Arc<RunControl>,
    device: RwLock<Option<AuthenticatedDevice>>,
    listener: Mutex<Option<JoinHandle<Result<(), ClientError>>>>,
    state: Arc<watch::Sender<SupervisorState>>,
}

impl PushoverClient {
    /// Client using the real provider, delivering to `sink`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        credentials: Credentials,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ClientError> {
        let parts = ClientParts::from_config(&config)?;
        Ok(Self::with_parts(config, credentials, parts, sink))
    }

    #[must_use]
    pub fn with_parts(
        config: ClientConfig,
        credentials: Credentials,
        parts: ClientParts,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let origin = MessageOrigin::new(
            credentials.email.clone(),
            credentials.device_name.to_string(),
        );
        let channel = Arc::new(MessageChannel::new(parts.api.clone(), origin, sink));
        Self {
            config,
            credentials,
            api: parts.api,
            store: parts.store,
            connector: parts.connector,
            channel,
            control: Arc::new(RunControl::new()),
            device: RwLock::new(None),
            listener: Mutex::new(None),
            state: Arc::new(watch::channel(SupervisorState::Idle).0),
        }
    }

    #[must_use]
    pub fn device_name(&self) -> &DeviceName {
        &self.credentials.device_name
    }

    /// Device id in use since the last successful `start`.
    #[must_use]
    pub fn device_id(&self) -> Option<String> {
        self.device
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.device_id.clone())
    }

    /// Watch the supervisor state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Register the observer sink, replacing any previous one.
    pub fn set_observer(&self, sink: Arc<dyn EventSink>) -> Option<Arc<dyn EventSink>> {
        self.channel.set_observer(sink)
    }

    /// Remove the observer sink.
    pub fn clear_observer(&self) -> Option<Arc<dyn EventSink>> {
        self.channel.clear_observer()
    }

    /// Log in, load or register the device, and discard the backlog.
    ///
    /// # Errors
    /// Returns [`ClientError::AuthFailure`] for refused credentials,
    /// [`ClientError::RegistrationFailure`] if a new device cannot be
    /// registered, and [`ClientError::Transport`] if the provider cannot be
    /// reached. Returns [`ClientError::Cancelled`] if `stop` was called while
    /// starting.
    pub async fn start(&self) -> Result<(), ClientError> {
        let generation = self.control.generation();
        let email = &self.credentials.email;
        let secret = self
            .api
            .login(email, &self.credentials.password)
            .await
            .map_err(|e| ClientError::login(email, e))?;
        tracing::info!(%email, "Authentication successful");

        let device_id = match self.load_cached_device_id().await {
            Some(device_id) => device_id,
            None => {
                let device_id = self.register_device(&secret).await?;
                self.save_device_id(&device_id).await;
                device_id
            }
        };

        let device = AuthenticatedDevice::new(device_id, secret);
        self.channel.drain_on_startup(&device).await;
        if !self.control.arm_since(generation) {
            tracing::info!("Stopped while starting, not arming the listener");
            return Err(ClientError::Cancelled);
        }
        *self.device.write().unwrap_or_else(PoisonError::into_inner) = Some(device);
        Ok(())
    }

    /// [`start`](Self::start), bounded by the configured start-up timeout.
    ///
    /// # Errors
    /// Returns [`ClientError::StartupTimeout`] on timeout, otherwise whatever
    /// `start` returns.
    pub async fn start_with_timeout(&self) -> Result<(), ClientError> {
        let timeout = self.config.startup_timeout();
        tokio::time::timeout(timeout, self.start())
            .await
            .map_err(|_| ClientError::StartupTimeout(timeout))?
    }

    /// Run the streaming connection until [`stop`](Self::stop).
    ///
    /// # Errors
    /// Returns [`ClientError::NotStarted`] before a successful `start`, and
    /// [`ClientError::Cancelled`] when `stop` interrupted a wait.
    pub async fn listen(&self) -> Result<(), ClientError> {
        let supervisor = self.supervisor()?;
        supervisor.run().await
    }

    /// Run [`listen`](Self::listen) on its own task, to be joined by `stop`.
    ///
    /// # Errors
    /// Returns [`ClientError::NotStarted`] before a successful `start`.
    pub fn spawn_listener(&self) -> Result<(), ClientError> {
        let supervisor = self.supervisor()?;
        let handle = tokio::spawn(supervisor.run());
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            tracing::warn!("Replacing a listener that was still registered");
            previous.abort();
        }
        Ok(())
    }

    /// Stop listening and wait for the listener task, bounded by the teardown
    /// timeout.
    pub async fn stop(&self) -> StopOutcome {
        tracing::info!(device_name = %self.credentials.device_name, "Stopping push listener");
        self.control.stop();

        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut handle) = handle else {
            return StopOutcome::Signalled;
        };

        match tokio::time::timeout(self.config.teardown_timeout(), &mut handle).await {
            Ok(Ok(Ok(()) | Err(ClientError::Cancelled))) => {
                tracing::debug!("Listener task stopped");
                StopOutcome::Stopped
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!("Listener task ended with error: {e}");
                StopOutcome::Stopped
            }
            Ok(Err(e)) => {
                tracing::warn!("Listener task panicked or was aborted: {e}");
                StopOutcome::Stopped
            }
            Err(_) => {
                tracing::warn!("Listener task did not stop in time");
                handle.abort();
                StopOutcome::TimedOut
            }
        }
    }

    fn supervisor(&self) -> Result<StreamSupervisor, ClientError> {
        let device = self
            .device
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ClientError::NotStarted)?;
        Ok(StreamSupervisor::new(
            self.connector.clone(),
            self.channel.clone(),
            device,
            ReconnectState::from(&self.config.reconnect),
            self.config.settle_delay(),
            self.control.clone(),
            self.state.clone(),
        ))
    }

    async fn load_cached_device_id(&self) -> Option<String> {
        match self.store.load(&self.credentials.device_name).await {
            Ok(identity) => identity.map(|i| i.device_id),
            Err(e) => {
                tracing::warn!("Failed to load cached device id, registering anew: {e}");
                None
            }
        }
    }

    async fn register_device(&self, secret: &str) -> Result<String, ClientError> {
        let name = &self.credentials.device_name;
        tracing::info!(device_name = %name, "Registering open client device...");
        let device_id = self
            .api
            .register_device(secret, name)
            .await
            .map_err(|e| ClientError::registration(name.as_str(), e))?;
        tracing::info!(%device_id, "Registered device");
        Ok(device_id)
    }

    async fn save_device_id(&self, device_id: &str) {
        let identity = DeviceIdentity::new(device_id);
        if let Err(e) = self
            .store
            .save(&self.credentials.device_name, &identity)
            .await
        {
            tracing::warn!("Failed to save device_id: {e}");
        }
    }
}
