//! Chat events produced by the lifecycle services.
//!
//! Events are the crate's only output besides store state; the transport that
//! carries them (websocket fan-out, queue, push) is an injected [`EventSink`].
//! Serialization is centralized in [`ChatEvent::to_payload_value`] so every
//! sink sees the same flat JSON shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatResult;
use crate::models::Message;

mod projector;

pub use projector::{DefaultSenderProjector, SenderProjector};

/// Events emitted after a lifecycle mutation commits.
///
/// Note: serialization of payloads goes through `to_payload_value()`; the
/// serde names on the variants keep the wire tag aligned with `event_type()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
    /// A message was persisted and fanned out to every participant.
    #[serde(rename = "message.sent")]
    MessageSent {
        id: Uuid,
        conversation_id: Uuid,
        body: String,
        message_type: String,
        data: serde_json::Value,
        created_at: DateTime<Utc>,
        sender: serde_json::Value,
    },

    /// Every participant has removed the message from their view; consumers
    /// decide archival or hard-deletion policy.
    #[serde(rename = "message.all_deleted")]
    AllParticipantsDeletedMessage {
        message_id: Uuid,
        conversation_id: Uuid,
    },
}

impl ChatEvent {
    pub fn message_sent(message: &Message, sender: serde_json::Value) -> Self {
        ChatEvent::MessageSent {
            id: message.id,
            conversation_id: message.conversation_id,
            body: message.body.clone(),
            message_type: message.message_type.clone(),
            data: message.data.clone(),
            created_at: message.created_at,
            sender,
        }
    }

    /// Get event type as string (e.g., "message.sent")
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageSent { .. } => "message.sent",
            Self::AllParticipantsDeletedMessage { .. } => "message.all_deleted",
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        match self {
            Self::MessageSent {
                conversation_id, ..
            } => *conversation_id,
            Self::AllParticipantsDeletedMessage {
                conversation_id, ..
            } => *conversation_id,
        }
    }

    /// Convert the event to a flat JSON payload:
    ///
    /// ```json
    /// {
    ///   "type": "message.sent",
    ///   "timestamp": "2026-08-06T10:30:00Z",
    ///   "id": "uuid",
    ///   "conversation_id": "uuid",
    ///   "body": "...",
    ///   "sender": { ... }
    /// }
    /// ```
    ///
    /// This is the only place where event serialization happens.
    pub fn to_payload_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut payload = serde_json::json!({
            "type": self.event_type(),
            "timestamp": Utc::now().to_rfc3339(),
        });

        // Unwrap the enum tag and flatten the variant fields into the payload
        let event_data = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = event_data {
            if let Some((_, serde_json::Value::Object(fields))) = map.into_iter().next() {
                for (key, value) in fields {
                    payload[key] = value;
                }
            }
        }

        Ok(payload)
    }
}

/// Receives committed chat events for downstream broadcast. Implementations
/// should be idempotent-friendly: a sink failure is logged by the caller, not
/// rolled back, since the mutation that produced the event is already durable.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: ChatEvent) -> ChatResult<()>;
}

/// Sink that writes events to the log. Stands in wherever no transport is
/// wired up, keeping emission observable.
#[derive(Debug, Default)]
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish(&self, event: ChatEvent) -> ChatResult<()> {
        let payload = event.to_payload_value()?;
        tracing::info!(
            event_type = event.event_type(),
            conversation_id = %event.conversation_id(),
            payload = %payload,
            "chat event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            participation_id: Uuid::new_v4(),
            body: "hello".into(),
            message_type: "text".into(),
            data: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_type_naming() {
        let message = sample_message();
        let event = ChatEvent::message_sent(&message, serde_json::json!({}));
        assert_eq!(event.event_type(), "message.sent");

        let event = ChatEvent::AllParticipantsDeletedMessage {
            message_id: message.id,
            conversation_id: message.conversation_id,
        };
        assert_eq!(event.event_type(), "message.all_deleted");
    }

    #[test]
    fn test_payload_is_flat() {
        let message = sample_message();
        let sender = serde_json::json!({"participant_type": "user"});
        let payload = ChatEvent::message_sent(&message, sender)
            .to_payload_value()
            .unwrap();

        assert_eq!(payload["type"], "message.sent");
        assert_eq!(payload["id"], message.id.to_string());
        assert_eq!(payload["conversation_id"], message.conversation_id.to_string());
        assert_eq!(payload["body"], "hello");
        assert_eq!(payload["sender"]["participant_type"], "user");
        assert!(payload["timestamp"].is_string());
        // no nested variant object left behind
        assert!(payload.get("message.sent").is_none());
    }

    #[test]
    fn test_all_deleted_payload_carries_both_ids() {
        let message_id = Uuid::new_v4();
        let conversation_id = Uuid::new_v4();
        let payload = ChatEvent::AllParticipantsDeletedMessage {
            message_id,
            conversation_id,
        }
        .to_payload_value()
        .unwrap();

        assert_eq!(payload["type"], "message.all_deleted");
        assert_eq!(payload["message_id"], message_id.to_string());
        assert_eq!(payload["conversation_id"], conversation_id.to_string());
    }
}
