//! Streaming connection supervisor.
//!
//! Drives one connection at a time through
//! `Connecting -> LoggedIn -> Disconnected -> (backoff) -> Connecting`
//! until the client is stopped. Every await point races the stop signal, so
//! `stop()` never waits on a socket or a sleep.

use std::{
    future::Future,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use pushover_listener_core::{
    AuthenticatedDevice, ControlFrame,
    frame::login_line,
    traits::{PushStream, StreamConnector},
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{ClientError, MessageChannel, ReconnectState};

/// Observable supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Not listening yet.
    Idle,
    Connecting,
    LoggedIn,
    /// Connection lost; the next attempt follows after `retry_in`.
    Disconnected { retry_in: Duration },
    Stopped,
}

/// Running flag plus the cancellation signal that interrupts the loop.
///
/// Every `stop()` bumps a generation counter, so a start that began before a
/// stop can tell it was overtaken.
#[derive(Debug, Default)]
pub struct RunControl {
    running: AtomicBool,
    stops: AtomicU64,
    token: RwLock<CancellationToken>,
}

impl RunControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stop generation, to be handed back to [`arm_since`](Self::arm_since).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }

    /// Mark as running, replacing a cancellation signal left over from an
    /// earlier stop.
    pub fn arm(&self) {
        self.arm_since(self.generation());
    }

    /// [`arm`](Self::arm), unless `stop()` ran since `generation` was taken.
    ///
    /// Returns whether the control was armed.
    pub fn arm_since(&self, generation: u64) -> bool {
        let mut token = self.token.write().unwrap_or_else(PoisonError::into_inner);
        if self.stops.load(Ordering::SeqCst) != generation {
            return false;
        }
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        self.running.store(true, Ordering::SeqCst);
        true
    }

    /// Clear the running flag and cancel whatever the loop is waiting on.
    pub fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal observed by the current run.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Await `fut` unless `token` fires first.
async fn cancellable<F: Future>(
    token: &CancellationToken,
    fut: F,
) -> Result<F::Output, ClientError> {
    tokio::select! {
        biased;
        () = token.cancelled() => Err(ClientError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Owns the streaming connection for one device.
pub struct StreamSupervisor {
    connector: Arc<dyn StreamConnector>,
    channel: Arc<MessageChannel>,
    device: AuthenticatedDevice,
    reconnect: ReconnectState,
    settle_delay: Duration,
    control: Arc<RunControl>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SupervisorState>>,
}

impl StreamSupervisor {
    #[must_use]
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        channel: Arc<MessageChannel>,
        device: AuthenticatedDevice,
        reconnect: ReconnectState,
        settle_delay: Duration,
        control: Arc<RunControl>,
        state: Arc<watch::Sender<SupervisorState>>,
    ) -> Self {
        let cancel = control.token();
        Self {
            connector,
            channel,
            device,
            reconnect,
            settle_delay,
            control,
            cancel,
            state,
        }
    }

    /// Run until stopped.
    ///
    /// Returns `Ok(())` when the loop saw the running flag cleared between
    /// attempts.
    ///
    /// # Errors
    /// Returns [`ClientError::Cancelled`] when stopped while waiting on the
    /// connection, the settle delay, a fetch, or the backoff sleep.
    pub async fn run(mut self) -> Result<(), ClientError> {
        tracing::info!("Starting persistent push stream listener");
        let result = self.run_loop().await;
        match &result {
            Ok(()) => tracing::info!("Push stream listener stopped"),
            Err(ClientError::Cancelled) => tracing::info!("Push stream listener cancelled"),
            Err(e) => tracing::error!("Push stream listener failed: {e}"),
        }
        self.set_state(SupervisorState::Stopped);
        result
    }

    async fn run_loop(&mut self) -> Result<(), ClientError> {
        while self.control.is_running() {
            self.set_state(SupervisorState::Connecting);
            let connected = cancellable(&self.cancel, self.connector.connect()).await?;
            match connected {
                Ok(mut stream) => {
                    let outcome = self.drive(stream.as_mut()).await;
                    if outcome.is_ok() {
                        stream.close().await;
                    }
                    outcome?;
                }
                Err(e) => tracing::error!("Push stream connection failed: {e}"),
            }

            if !self.control.is_running() {
                break;
            }
            let delay = self.reconnect.current();
            self.set_state(SupervisorState::Disconnected { retry_in: delay });
            tracing::info!("Waiting {delay:?} to reconnect...");
            cancellable(&self.cancel, tokio::time::sleep(delay)).await?;
            self.reconnect.advance();
        }
        Ok(())
    }

    /// Log in and process frames until the connection drops.
    async fn drive(&mut self, stream: &mut dyn PushStream) -> Result<(), ClientError> {
        let login = login_line(&self.device.device_id, &self.device.secret);
        if let Err(e) = cancellable(&self.cancel, stream.send_line(&login)).await? {
            tracing::error!("Push stream login failed: {e}");
            return Ok(());
        }
        self.reconnect.reset();
        self.set_state(SupervisorState::LoggedIn);
        tracing::info!(device_id = %self.device.device_id, "Push stream connection established");

        loop {
            let frame = match cancellable(&self.cancel, stream.next_frame()).await? {
                None => {
                    tracing::warn!("Push stream closed by server");
                    return Ok(());
                }
                Some(Err(e)) => {
                    tracing::error!("Push stream error: {e}");
                    return Ok(());
                }
                Some(Ok(frame)) => frame,
            };

            match frame {
                ControlFrame::KeepAlive => {}
                ControlFrame::NewMessages => {
                    cancellable(&self.cancel, tokio::time::sleep(self.settle_delay)).await?;
                    cancellable(&self.cancel, self.channel.fetch_and_deliver(&self.device))
                        .await?;
                }
                ControlFrame::Reconnect(reason) => {
                    tracing::warn!("Received control frame {reason:?}, reconnecting...");
                    return Ok(());
                }
                ControlFrame::Unknown(data) => {
                    tracing::debug!("Ignoring unknown control frame {data:?}");
                }
            }
        }
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.send_replace(state);
    }
}
