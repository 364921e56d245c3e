use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParticipantRef;

/// One participant's view of one message: seen, flagged, and soft-deleted
/// state. Exactly one row exists per (message, participant) pair; a
/// soft-deleted row means the participant removed the message from their view.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageNotification {
    pub id: Uuid,
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub participant_type: String,
    pub participant_id: Uuid,
    pub is_sender: bool,
    pub is_seen: bool,
    pub flagged: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageNotification {
    pub fn participant(&self) -> ParticipantRef {
        ParticipantRef::new(self.participant_type.clone(), self.participant_id)
    }

    /// `updated_at` doubles as the read timestamp once the row is seen.
    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.is_seen.then_some(self.updated_at)
    }
}
