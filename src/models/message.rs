use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message as persisted. Created once by send; never mutated afterwards.
/// Per-participant state lives on the notification rows, not here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub participation_id: Uuid,
    pub body: String,
    pub message_type: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
