//! In-memory fakes shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use pushover_listener_core::{
    AuthenticatedDevice, ControlFrame, DeviceName, EventSink, Message, MessageEvent,
    MessageOrigin,
    traits::{ApiError, ProviderApi, PushStream, StreamConnector, StreamError},
};
use serde_json::{Value, json};
use tokio::{sync::Notify, time::Instant};

pub const EMAIL: &str = "me@example.com";
pub const PASSWORD: &str = "hunter2";
pub const SECRET: &str = "secret-1";

/// Observable side effect, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login,
    Register,
    Fetch,
    Acknowledge(u64),
    Emit(u64),
    Connect,
    SendLine(String),
}

/// Ordered record of calls across fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| wanted(c)).count()
    }
}

pub fn origin() -> MessageOrigin {
    MessageOrigin::new(EMAIL, "homeassistant")
}

pub fn device() -> AuthenticatedDevice {
    AuthenticatedDevice::new("device-1", SECRET)
}

pub fn device_name() -> DeviceName {
    DeviceName::parse("homeassistant").unwrap()
}

fn message(id: u64) -> Message {
    serde_json::from_value(json!({
        "id": id.to_string(),
        "title": format!("Message {id}"),
        "message": "source=fake",
    }))
    .unwrap()
}

fn transport_error(endpoint: &'static str) -> ApiError {
    ApiError::Transport {
        endpoint,
        message: "connection refused".into(),
    }
}

fn rejected(endpoint: &'static str) -> ApiError {
    ApiError::Rejected {
        endpoint,
        errors: "rejected".into(),
    }
}

/// Provider with a message queue and switchable failures.
pub struct FakeApi {
    journal: Journal,
    pending: Mutex<Vec<Message>>,
    registrations: AtomicUsize,
    login_gate: Mutex<Option<Arc<Notify>>>,
    login_unreachable: AtomicBool,
    reject_registration: AtomicBool,
    fail_fetch: AtomicBool,
    undecodable_batch: AtomicBool,
    fail_acknowledge: AtomicBool,
}

impl FakeApi {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            pending: Mutex::new(Vec::new()),
            registrations: AtomicUsize::new(0),
            login_gate: Mutex::new(None),
            login_unreachable: AtomicBool::new(false),
            reject_registration: AtomicBool::new(false),
            fail_fetch: AtomicBool::new(false),
            undecodable_batch: AtomicBool::new(false),
            fail_acknowledge: AtomicBool::new(false),
        }
    }

    pub fn with_pending(self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.push_pending(ids);
        self
    }

    pub fn push_pending(&self, ids: impl IntoIterator<Item = u64>) {
        self.pending
            .lock()
            .unwrap()
            .extend(ids.into_iter().map(message));
    }

    pub fn pending_ids(&self) -> Vec<u64> {
        self.pending.lock().unwrap().iter().map(Message::id).collect()
    }

    /// Hold the next login until the returned gate is notified.
    pub fn gate_login(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.login_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn login_unreachable(&self, value: bool) {
        self.login_unreachable.store(value, Ordering::SeqCst);
    }

    pub fn reject_registration(&self, value: bool) {
        self.reject_registration.store(value, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self, value: bool) {
        self.fail_fetch.store(value, Ordering::SeqCst);
    }

    /// Answer fetches the way the HTTP client does when a record has no usable id.
    pub fn undecodable_batch(&self, value: bool) {
        self.undecodable_batch.store(value, Ordering::SeqCst);
    }

    pub fn fail_acknowledge(&self, value: bool) {
        self.fail_acknowledge.store(value, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderApi for FakeApi {
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        self.journal.record(Call::Login);
        let gate = self.login_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.login_unreachable.load(Ordering::SeqCst) {
            return Err(transport_error("login"));
        }
        if email == EMAIL && password == PASSWORD {
            Ok(SECRET.to_string())
        } else {
            Err(rejected("login"))
        }
    }

    async fn register_device(&self, secret: &str, _name: &DeviceName) -> Result<String, ApiError> {
        self.journal.record(Call::Register);
        assert_eq!(secret, SECRET);
        if self.reject_registration.load(Ordering::SeqCst) {
            return Err(rejected("device registration"));
        }
        let n = self.registrations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("device-{n}"))
    }

    async fn fetch_messages(
        &self,
        secret: &str,
        _device_id: &str,
    ) -> Result<Vec<Message>, ApiError> {
        self.journal.record(Call::Fetch);
        assert_eq!(secret, SECRET);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(transport_error("message fetch"));
        }
        if self.undecodable_batch.load(Ordering::SeqCst) {
            return Err(ApiError::Decode {
                endpoint: "message fetch",
                message: "message id is not an unsigned integer: 5.0".into(),
            });
        }
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn delete_messages_up_to(
        &self,
        _secret: &str,
        _device_id: &str,
        max_id: u64,
    ) -> Result<(), ApiError> {
        self.journal.record(Call::Acknowledge(max_id));
        if self.fail_acknowledge.load(Ordering::SeqCst) {
            return Err(transport_error("message acknowledge"));
        }
        self.pending.lock().unwrap().retain(|m| m.id() > max_id);
        Ok(())
    }
}

/// Sink that keeps every event and journals its message id.
pub struct RecordingSink {
    journal: Journal,
    events: Mutex<Vec<MessageEvent>>,
}

impl RecordingSink {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<MessageEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn delivered_ids(&self) -> Vec<u64> {
        self.events()
            .iter()
            .filter_map(|e| e.get("id").and_then(Value::as_str)?.parse().ok())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: MessageEvent) {
        let id = event
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| id.parse().ok())
            .unwrap_or_default();
        self.journal.record(Call::Emit(id));
        self.events.lock().unwrap().push(event);
    }
}

/// What one connection attempt does.
#[derive(Debug, Clone)]
pub enum Attempt {
    /// Connecting fails.
    Fail,
    /// Connects, serves these frames, then the server closes.
    Frames(Vec<ControlFrame>),
    /// Connects, serves these frames, then stays open and silent.
    FramesThenHang(Vec<ControlFrame>),
    /// Connects, serves these frames, then fails the next read.
    FramesThenError(Vec<ControlFrame>),
}

/// Connector that plays back scripted attempts.
pub struct FakeConnector {
    journal: Journal,
    script: Mutex<VecDeque<Attempt>>,
    when_exhausted: Attempt,
    attempts: Mutex<Vec<Instant>>,
}

impl FakeConnector {
    pub fn new(journal: &Journal, script: impl IntoIterator<Item = Attempt>) -> Self {
        Self {
            journal: journal.clone(),
            script: Mutex::new(script.into_iter().collect()),
            when_exhausted: Attempt::FramesThenHang(Vec::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Keep failing once the script runs out.
    pub fn failing_forever(journal: &Journal) -> Self {
        Self {
            when_exhausted: Attempt::Fail,
            ..Self::new(journal, Vec::new())
        }
    }

    /// When each attempt was made, in tokio time.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn PushStream>, StreamError> {
        self.journal.record(Call::Connect);
        self.attempts.lock().unwrap().push(Instant::now());
        let attempt = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.when_exhausted.clone());
        let (frames, end) = match attempt {
            Attempt::Fail => return Err(StreamError::Connect("refused".into())),
            Attempt::Frames(frames) => (frames, StreamEnd::Close),
            Attempt::FramesThenHang(frames) => (frames, StreamEnd::Hang),
            Attempt::FramesThenError(frames) => (frames, StreamEnd::Error),
        };
        Ok(Box::new(FakeStream {
            journal: self.journal.clone(),
            frames: frames.into(),
            end,
        }))
    }
}

enum StreamEnd {
    Close,
    Hang,
    Error,
}

struct FakeStream {
    journal: Journal,
    frames: VecDeque<ControlFrame>,
    end: StreamEnd,
}

#[async_trait]
impl PushStream for FakeStream {
    async fn send_line(&mut self, line: &str) -> Result<(), StreamError> {
        self.journal.record(Call::SendLine(line.to_string()));
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<ControlFrame, StreamError>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        match self.end {
            StreamEnd::Close => None,
            StreamEnd::Hang => std::future::pending().await,
            StreamEnd::Error => Some(Err(StreamError::Receive("no frame within 90s".into()))),
        }
    }

    async fn close(&mut self) {}
}
