use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ChatError, ChatResult};
use crate::models::ParticipantRef;
use crate::store::NotificationStore;

/// Per-participant read and flag state. Every operation targets a single
/// notification row and is atomic at that row.
pub struct ReadFlagService {
    notifications: Arc<dyn NotificationStore>,
}

impl ReadFlagService {
    pub fn new(notifications: Arc<dyn NotificationStore>) -> Self {
        Self { notifications }
    }

    /// Marks the message as read for the participant. Idempotent: `is_seen`
    /// stays true on repeat calls while the read timestamp advances.
    pub async fn mark_read(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<()> {
        let updated = self.notifications.mark_read(message_id, participant).await?;
        if updated == 0 {
            return Err(ChatError::NotificationNotFound { message_id });
        }
        Ok(())
    }

    /// Marks every unseen message in the conversation as read for the
    /// participant; returns how many became seen.
    pub async fn mark_read_all(
        &self,
        conversation_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<u64> {
        let updated = self
            .notifications
            .mark_read_all(conversation_id, participant)
            .await?;
        debug!(
            conversation_id = %conversation_id,
            participant = %participant,
            updated = updated,
            "conversation marked read"
        );
        Ok(updated)
    }

    /// True iff the participant's active notification is flagged.
    pub async fn flagged(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<bool> {
        self.notifications.flagged(message_id, participant).await
    }

    /// Flips the flag on the participant's notification and returns the new
    /// value. Not idempotent: each call toggles.
    pub async fn toggle_flag(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<bool> {
        self.notifications
            .toggle_flag(message_id, participant)
            .await?
            .ok_or(ChatError::NotificationNotFound { message_id })
    }

    /// Unseen active notifications for the participant across all
    /// conversations.
    pub async fn unread_count(&self, participant: &ParticipantRef) -> ChatResult<i64> {
        self.notifications.count_unread(participant).await
    }
}
