use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParticipantRef;

/// A participant's membership in one conversation. Immutable once created;
/// owned by the membership collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participation {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub participant_type: String,
    pub participant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Participation {
    pub fn participant(&self) -> ParticipantRef {
        ParticipantRef::new(self.participant_type.clone(), self.participant_id)
    }
}
