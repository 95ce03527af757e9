//! Event sinks.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{broadcast, mpsc};

use crate::MessageEvent;

/// Receiver of delivered messages.
///
/// `emit` is called on the listener task; implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MessageEvent);
}

impl EventSink for mpsc::UnboundedSender<MessageEvent> {
    fn emit(&self, event: MessageEvent) {
        if self.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

impl EventSink for broadcast::Sender<MessageEvent> {
    fn emit(&self, event: MessageEvent) {
        // No subscribers is not an error.
        let _ = self.send(event);
    }
}

/// Slot holding at most one optional sink.
///
/// Registering replaces the previous sink; clearing removes it.
#[derive(Default)]
pub struct SinkSlot {
    inner: RwLock<Option<Arc<dyn EventSink>>>,
}

impl SinkSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `sink`, returning the one it replaced.
    pub fn replace(&self, sink: Arc<dyn EventSink>) -> Option<Arc<dyn EventSink>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(sink)
    }

    /// Remove the current sink, returning it.
    pub fn clear(&self) -> Option<Arc<dyn EventSink>> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Forward `event` to the installed sink, if any.
    pub fn emit(&self, event: &MessageEvent) {
        let sink = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sink) = sink {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::EVENT_TYPE;

    fn event() -> MessageEvent {
        MessageEvent {
            event_type: EVENT_TYPE,
            data: Map::new(),
        }
    }

    #[test]
    fn test_slot_replace_and_clear() {
        let slot = SinkSlot::new();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();

        assert!(slot.replace(Arc::new(first_tx)).is_none());
        slot.emit(&event());
        assert!(first_rx.try_recv().is_ok());

        assert!(slot.replace(Arc::new(second_tx)).is_some());
        slot.emit(&event());
        assert!(first_rx.try_recv().is_err());
        assert!(second_rx.try_recv().is_ok());

        assert!(slot.clear().is_some());
        assert!(!slot.is_set());
        slot.emit(&event());
        assert!(second_rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_sink_without_subscribers() {
        let (tx, _) = broadcast::channel(4);
        tx.emit(event());
    }
}
