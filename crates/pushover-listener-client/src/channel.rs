//! Fetch, emit and acknowledge: the at-least-once delivery primitive.

use std::sync::Arc;

use pushover_listener_core::{
    AuthenticatedDevice, EventSink, Message, MessageEvent, MessageOrigin, SinkSlot,
    traits::{ApiError, ProviderApi},
};

/// Drains the provider's message store for one device.
///
/// Every delivered message goes to the primary sink and, when one is
/// registered, to the observer sink. A batch is acknowledged only after all of
/// its messages were emitted, and only up to the highest id in the batch.
pub struct MessageChannel {
    api: Arc<dyn ProviderApi>,
    origin: MessageOrigin,
    sink: Arc<dyn EventSink>,
    observer: SinkSlot,
}

impl MessageChannel {
    #[must_use]
    pub fn new(api: Arc<dyn ProviderApi>, origin: MessageOrigin, sink: Arc<dyn EventSink>) -> Self {
        Self {
            api,
            origin,
            sink,
            observer: SinkSlot::new(),
        }
    }

    /// Register the observer sink, replacing any previous one.
    pub fn set_observer(&self, sink: Arc<dyn EventSink>) -> Option<Arc<dyn EventSink>> {
        self.observer.replace(sink)
    }

    /// Remove the observer sink.
    pub fn clear_observer(&self) -> Option<Arc<dyn EventSink>> {
        self.observer.clear()
    }

    /// Messages currently queued for the device, in provider order.
    ///
    /// # Errors
    /// Returns error if the provider cannot be reached or refuses the request.
    pub async fn fetch_pending(
        &self,
        device: &AuthenticatedDevice,
    ) -> Result<Vec<Message>, ApiError> {
        self.api
            .fetch_messages(&device.secret, &device.device_id)
            .await
    }

    /// Let the provider discard every message up to and including `max_id`.
    ///
    /// # Errors
    /// Returns error if the provider cannot be reached or refuses the request.
    pub async fn acknowledge_up_to(
        &self,
        device: &AuthenticatedDevice,
        max_id: u64,
    ) -> Result<(), ApiError> {
        self.api
            .delete_messages_up_to(&device.secret, &device.device_id, max_id)
            .await
    }

    /// Discard whatever was queued while nobody was listening, without emitting.
    ///
    /// Returns the number of discarded messages. Failures are logged; a missed
    /// drain only means the backlog is delivered later.
    pub async fn drain_on_startup(&self, device: &AuthenticatedDevice) -> usize {
        tracing::info!("Checking for old messages to discard...");
        let messages = match self.fetch_pending(device).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to download old messages: {e}");
                return 0;
            }
        };
        let Some(max_id) = max_id(&messages) else {
            return 0;
        };

        tracing::info!("Discarding {} old messages...", messages.len());
        if let Err(e) = self.acknowledge_up_to(device, max_id).await {
            tracing::warn!("Failed to delete old messages: {e}");
        }
        messages.len()
    }

    /// Fetch pending messages, emit each one, then acknowledge the batch.
    ///
    /// Returns the number of emitted messages. Failures are logged; a failed
    /// fetch is retried on the next signal and a failed acknowledge means the
    /// same batch is emitted again then.
    pub async fn fetch_and_deliver(&self, device: &AuthenticatedDevice) -> usize {
        let messages = match self.fetch_pending(device).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!("Failed to fetch messages: {e}");
                return 0;
            }
        };
        let Some(max_id) = max_id(&messages) else {
            return 0;
        };

        for message in &messages {
            let event = MessageEvent::new(message, &self.origin);
            tracing::info!(
                message_id = message.id(),
                summary = event.summary(),
                "Delivering message"
            );
            self.observer.emit(&event);
            self.sink.emit(event);
        }

        if let Err(e) = self.acknowledge_up_to(device, max_id).await {
            tracing::warn!("Failed to delete messages up to {max_id}: {e}");
        }
        messages.len()
    }
}

// Provider order is usually ascending but is not relied upon.
fn max_id(messages: &[Message]) -> Option<u64> {
    messages.iter().map(Message::id).max()
}
