//! Running clients, keyed by the host's configuration entry id.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{ClientError, PushoverClient, StopOutcome};

/// Owns one client per configuration entry.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, Arc<PushoverClient>>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `client`, spawn its listener and register it under `entry_id`.
    ///
    /// A client already registered under the same id is stopped first. The
    /// map is only locked to take out or put in clients, never while one is
    /// starting or stopping.
    ///
    /// # Errors
    /// Returns error if the client fails to start; nothing is registered then.
    pub async fn start_entry(
        &self,
        entry_id: impl Into<String>,
        client: Arc<PushoverClient>,
    ) -> Result<(), ClientError> {
        let entry_id = entry_id.into();
        let previous = self.clients.lock().await.remove(&entry_id);
        if let Some(previous) = previous {
            tracing::info!(%entry_id, "Replacing running client");
            previous.stop().await;
        }

        client.start_with_timeout().await?;
        client.spawn_listener()?;
        tracing::info!(%entry_id, device_name = %client.device_name(), "Client started");

        let displaced = self.clients.lock().await.insert(entry_id, client);
        if let Some(displaced) = displaced {
            tracing::info!("Entry was started concurrently, stopping the older client");
            displaced.stop().await;
        }
        Ok(())
    }

    /// Stop and forget the client for `entry_id`, if any.
    pub async fn stop_entry(&self, entry_id: &str) -> Option<StopOutcome> {
        let client = self.clients.lock().await.remove(entry_id)?;
        Some(client.stop().await)
    }

    /// Stop every registered client.
    pub async fn stop_all(&self) {
        let clients: Vec<_> = self.clients.lock().await.drain().collect();
        for (entry_id, client) in clients {
            let outcome = client.stop().await;
            tracing::debug!(%entry_id, ?outcome, "Client stopped");
        }
    }

    pub async fn get(&self, entry_id: &str) -> Option<Arc<PushoverClient>> {
        self.clients.lock().await.get(entry_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}
