use std::sync::Arc;
use uuid::Uuid;

use crate::error::ChatResult;
use crate::models::{Conversation, Message, ParticipantRef};
use crate::store::{ConversationFilters, MessageStore, NotificationStore};

/// One conversation in a listing: the conversation, the newest message the
/// requesting participant has not deleted, optionally their unread tally and
/// the resolved participant list.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub unread_count: Option<i64>,
    pub participants: Option<Vec<ParticipantRef>>,
}

/// Builds conversation listings for one participant from messages,
/// notifications, and conversation filters.
pub struct ConversationService {
    messages: Arc<dyn MessageStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl ConversationService {
    pub fn new(messages: Arc<dyn MessageStore>, notifications: Arc<dyn NotificationStore>) -> Self {
        Self {
            messages,
            notifications,
        }
    }

    /// List conversation summaries for a participant, newest activity first
    /// (`updated_at DESC`, ties broken by id descending), one row per
    /// conversation.
    ///
    /// With `direct_message == Some(true)` each summary resolves the other
    /// party (the requester is excluded from the participant list); with
    /// `Some(false)` the full participant list is attached; with `None`
    /// participants are not resolved at all.
    pub async fn list(
        &self,
        participant: &ParticipantRef,
        filters: &ConversationFilters,
        limit: i64,
        offset: i64,
    ) -> ChatResult<Vec<ConversationSummary>> {
        let rows = self
            .notifications
            .conversation_summaries(participant, filters, limit, offset)
            .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let participants = self
                .resolve_participants(row.conversation.id, participant, filters)
                .await?;
            summaries.push(ConversationSummary {
                conversation: row.conversation,
                last_message: row.last_message,
                unread_count: row.unread_count,
                participants,
            });
        }
        Ok(summaries)
    }

    async fn resolve_participants(
        &self,
        conversation_id: Uuid,
        requester: &ParticipantRef,
        filters: &ConversationFilters,
    ) -> ChatResult<Option<Vec<ParticipantRef>>> {
        match filters.direct_message {
            Some(true) => {
                let mut participants = self.messages.participants(conversation_id).await?;
                participants.retain(|p| p != requester);
                Ok(Some(participants))
            }
            Some(false) => Ok(Some(self.messages.participants(conversation_id).await?)),
            None => Ok(None),
        }
    }
}
