use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::ChatResult;
use crate::models::{Conversation, Message, MessageNotification, ParticipantRef, Participation};

mod postgres;

pub use postgres::{PgMessageStore, PgNotificationStore};

/// Filter set for conversation listings. All filters are optional and compose
/// independently; the store builds one deterministic join plan from them.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilters {
    pub private: Option<bool>,
    pub direct_message: Option<bool>,
    pub include_unread_count: bool,
}

/// One row of the conversation summary join: the conversation, the newest
/// message still visible to the requesting participant, and the unread tally
/// when it was requested.
#[derive(Debug, Clone)]
pub struct ConversationSummaryRow {
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub unread_count: Option<i64>,
}

/// Persistence for messages, conversations, and participations. Conversations
/// and participations are owned elsewhere; this store only reads them, plus
/// the touch on `updated_at` when a message lands.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a message. Must run inside the caller's transaction so the
    /// message and its notification fan-out commit as one unit.
    async fn create_message(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        participation_id: Uuid,
        body: &str,
        message_type: &str,
        data: serde_json::Value,
    ) -> ChatResult<Message>;

    /// Bump the conversation's `updated_at`. Advisory for list ordering;
    /// last writer wins under concurrent sends.
    async fn touch_conversation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
    ) -> ChatResult<()>;

    async fn conversation(&self, conversation_id: Uuid) -> ChatResult<Option<Conversation>>;

    async fn participation(&self, participation_id: Uuid) -> ChatResult<Option<Participation>>;

    async fn message(&self, message_id: Uuid) -> ChatResult<Option<Message>>;

    /// Participant list read inside the fan-out transaction, so membership
    /// observed by the fan-out matches what the commit makes durable.
    async fn participants_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
    ) -> ChatResult<Vec<ParticipantRef>>;

    async fn participants(&self, conversation_id: Uuid) -> ChatResult<Vec<ParticipantRef>>;
}

/// Persistence for per-participant message notification rows.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Create one notification row per participant for a freshly inserted
    /// message. Runs inside the send transaction; the sender's own row is
    /// marked `is_sender`.
    async fn create_for_participants(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message: &Message,
        participants: &[ParticipantRef],
        sender: &ParticipantRef,
    ) -> ChatResult<()>;

    async fn find(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<Option<MessageNotification>>;

    /// Soft-delete the participant's row if it is still active. Returns the
    /// number of rows affected (0 when absent or already deleted). Takes a
    /// row lock on the message so concurrent deletes for the same message
    /// serialize and the caller's recount is race-free.
    async fn soft_delete(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<u64>;

    /// Active-row count inside the deleting transaction; pairs with
    /// `soft_delete` to detect the transition to zero.
    async fn count_active_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message_id: Uuid,
    ) -> ChatResult<i64>;

    async fn count_active(&self, message_id: Uuid) -> ChatResult<i64>;

    /// Set `is_seen` and stamp the read timestamp on the participant's active
    /// row. Returns rows affected (0 when no active row exists).
    async fn mark_read(&self, message_id: Uuid, participant: &ParticipantRef) -> ChatResult<u64>;

    /// Mark every unseen active row in the conversation for this participant.
    /// Returns the number of rows that became seen.
    async fn mark_read_all(
        &self,
        conversation_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<u64>;

    /// Atomically flip `flagged` on the participant's active row and return
    /// the new value, or None when no active row exists.
    async fn toggle_flag(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<Option<bool>>;

    async fn flagged(&self, message_id: Uuid, participant: &ParticipantRef) -> ChatResult<bool>;

    /// Unseen active rows for this participant across all conversations.
    async fn count_unread(&self, participant: &ParticipantRef) -> ChatResult<i64>;

    /// Conversations the participant belongs to, each with its newest message
    /// still active for them, ordered by `updated_at DESC, id DESC`, one row
    /// per conversation.
    async fn conversation_summaries(
        &self,
        participant: &ParticipantRef,
        filters: &ConversationFilters,
        limit: i64,
        offset: i64,
    ) -> ChatResult<Vec<ConversationSummaryRow>>;
}
