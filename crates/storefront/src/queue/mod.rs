//! Append-only event queue used for the audit trail.
//!
//! Records are serialized to JSON and wrapped in a base64 envelope before
//! they are appended, so consumers can decode any message the same way
//! regardless of backend. Messages are never read back by this application.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::db::StoreError;

pub use memory::MemoryEventQueue;
pub use postgres::PgEventQueue;

/// A named FIFO of encoded messages.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Queue name, for logs.
    fn name(&self) -> &str;

    /// Create the queue if it does not exist yet. Idempotent.
    async fn ensure_queue(&self) -> Result<(), StoreError>;

    /// Append an already encoded envelope.
    async fn send(&self, envelope: String) -> Result<(), StoreError>;
}

/// Serialize `record` and append it to `queue`.
///
/// # Errors
///
/// Returns `StoreError::Validation` if the record cannot be serialized, or
/// the queue's own error if the append fails.
pub async fn publish<R>(queue: &dyn EventQueue, record: &R) -> Result<(), StoreError>
where
    R: Serialize + Sync + ?Sized,
{
    let envelope = encode_envelope(record)?;
    queue.send(envelope).await
}

/// Base64 of the UTF-8 JSON form of `record`.
///
/// # Errors
///
/// Returns `StoreError::Validation` if the record cannot be serialized.
pub fn encode_envelope<R: Serialize + ?Sized>(record: &R) -> Result<String, StoreError> {
    let json = serde_json::to_vec(record)
        .map_err(|e| StoreError::Validation(format!("unserializable queue record: {e}")))?;
    Ok(STANDARD.encode(json))
}

/// Inverse of [`encode_envelope`].
///
/// # Errors
///
/// Returns `StoreError::Validation` if the envelope is not base64 JSON of `R`.
pub fn decode_envelope<R: DeserializeOwned>(envelope: &str) -> Result<R, StoreError> {
    let json = STANDARD
        .decode(envelope)
        .map_err(|e| StoreError::Validation(format!("queue envelope is not base64: {e}")))?;
    serde_json::from_slice(&json)
        .map_err(|e| StoreError::Validation(format!("queue envelope is not a record: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use abc_retail_core::AuditEvent;

    use super::*;

    #[test]
    fn test_envelope_is_base64_json() {
        let envelope = encode_envelope(&AuditEvent::order_created("42")).unwrap();
        let json = STANDARD.decode(&envelope).unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"TableName":"Orders","Action":"Create","Description":"Order 42 created."}"#
        );

        let event: AuditEvent = decode_envelope(&envelope).unwrap();
        assert_eq!(event, AuditEvent::order_created("42"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_envelope::<AuditEvent>("not base64!").is_err());
        let not_json = STANDARD.encode("hello");
        assert!(decode_envelope::<AuditEvent>(&not_json).is_err());
    }
}
