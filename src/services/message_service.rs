use sqlx::{Pool, Postgres};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ChatError, ChatResult};
use crate::events::{ChatEvent, EventSink, SenderProjector};
use crate::models::{Message, MessageNotification, ParticipantRef};
use crate::store::{MessageStore, NotificationStore};

/// Message lifecycle: send with fan-out, per-participant trash, and the
/// transition to "deleted by everyone".
pub struct MessageService {
    db: Pool<Postgres>,
    messages: Arc<dyn MessageStore>,
    notifications: Arc<dyn NotificationStore>,
    events: Arc<dyn EventSink>,
    sender_projector: Arc<dyn SenderProjector>,
}

impl MessageService {
    pub fn new(
        db: Pool<Postgres>,
        messages: Arc<dyn MessageStore>,
        notifications: Arc<dyn NotificationStore>,
        events: Arc<dyn EventSink>,
        sender_projector: Arc<dyn SenderProjector>,
    ) -> Self {
        Self {
            db,
            messages,
            notifications,
            events,
            sender_projector,
        }
    }

    /// Adds a message to a conversation.
    ///
    /// The message insert, the conversation touch, and the notification
    /// fan-out (one row per participant, sender included) commit as a single
    /// transaction; a partial fan-out is never observable. The `message.sent`
    /// event is published after the commit.
    pub async fn send(
        &self,
        conversation_id: Uuid,
        body: &str,
        sender_participation_id: Uuid,
        message_type: &str,
        data: serde_json::Value,
    ) -> ChatResult<Message> {
        let conversation = self
            .messages
            .conversation(conversation_id)
            .await?
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;

        let participation = self
            .messages
            .participation(sender_participation_id)
            .await?
            .ok_or(ChatError::ParticipationNotFound(sender_participation_id))?;

        if participation.conversation_id != conversation.id {
            return Err(ChatError::ParticipantNotAuthorized { conversation_id });
        }

        let mut tx = self.db.begin().await?;
        let message = self
            .messages
            .create_message(
                &mut tx,
                conversation_id,
                participation.id,
                body,
                message_type,
                data,
            )
            .await?;
        self.messages
            .touch_conversation(&mut tx, conversation_id)
            .await?;
        let participants = self
            .messages
            .participants_in_tx(&mut tx, conversation_id)
            .await?;
        let sender = participation.participant();
        self.notifications
            .create_for_participants(&mut tx, &message, &participants, &sender)
            .await?;
        tx.commit().await?;

        info!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            participants = participants.len(),
            "message sent"
        );

        let event = ChatEvent::message_sent(&message, self.sender_projector.project(&participation));
        if let Err(e) = self.events.publish(event).await {
            warn!(message_id = %message.id, error = %e, "failed to publish message.sent event");
        }

        Ok(message)
    }

    /// Deletes a message for one participant.
    ///
    /// A no-op when the participant has no active notification. When this
    /// delete removes the last active notification, `message.all_deleted` is
    /// published exactly once; the delete and the recount share a transaction
    /// so concurrent last-deleters cannot miss or double the signal.
    pub async fn trash(&self, message_id: Uuid, participant: &ParticipantRef) -> ChatResult<()> {
        let mut tx = self.db.begin().await?;
        let deleted = self
            .notifications
            .soft_delete(&mut tx, message_id, participant)
            .await?;
        let remaining = self
            .notifications
            .count_active_in_tx(&mut tx, message_id)
            .await?;
        tx.commit().await?;

        if deleted == 0 {
            debug!(message_id = %message_id, participant = %participant, "trash: no active notification");
            return Ok(());
        }

        debug!(
            message_id = %message_id,
            participant = %participant,
            remaining = remaining,
            "message trashed for participant"
        );

        if remaining == 0 {
            if let Some(message) = self.messages.message(message_id).await? {
                let event = ChatEvent::AllParticipantsDeletedMessage {
                    message_id,
                    conversation_id: message.conversation_id,
                };
                if let Err(e) = self.events.publish(event).await {
                    warn!(message_id = %message_id, error = %e, "failed to publish message.all_deleted event");
                }
            }
        }

        Ok(())
    }

    /// Count of notifications still active for the message; zero means every
    /// participant has deleted it.
    pub async fn undeleted_count(&self, message_id: Uuid) -> ChatResult<i64> {
        self.notifications.count_active(message_id).await
    }

    /// The participant's notification row for a message, when still active.
    /// `updated_at` doubles as the read timestamp once the row is seen.
    pub async fn notification(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<Option<MessageNotification>> {
        self.notifications.find(message_id, participant).await
    }
}
