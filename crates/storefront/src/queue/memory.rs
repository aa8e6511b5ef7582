//! In-process event queue.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::{EventQueue, decode_envelope};
use crate::db::StoreError;

/// Queue that keeps envelopes in memory, in append order.
pub struct MemoryEventQueue {
    name: String,
    messages: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MemoryEventQueue {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every append fail with `StorageFailure`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Raw envelopes, oldest first.
    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    /// Decoded records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if any envelope does not decode as `R`.
    pub async fn decoded<R: DeserializeOwned>(&self) -> Result<Vec<R>, StoreError> {
        self.messages
            .lock()
            .await
            .iter()
            .map(|envelope| decode_envelope(envelope))
            .collect()
    }
}

#[async_trait]
impl EventQueue for MemoryEventQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_queue(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn send(&self, envelope: String) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::failure(
                format!("send to queue {}", self.name),
                "injected fault",
            ));
        }
        self.messages.lock().await.push(envelope);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use abc_retail_core::AuditEvent;

    use super::*;
    use crate::queue::publish;

    #[tokio::test]
    async fn test_publish_preserves_order() {
        let queue = MemoryEventQueue::new("audit-events");
        publish(&queue, &AuditEvent::session("Login", "first")).await.unwrap();
        publish(&queue, &AuditEvent::session("Logout", "second")).await.unwrap();

        let events: Vec<AuditEvent> = queue.decoded().await.unwrap();
        let actions: Vec<_> = events.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["Login", "Logout"]);
    }

    #[tokio::test]
    async fn test_failing_queue_keeps_nothing() {
        let queue = MemoryEventQueue::new("audit-events");
        queue.set_failing(true);
        let err = publish(&queue, &AuditEvent::session("Login", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure { .. }));
        assert!(queue.messages().await.is_empty());
    }
}
