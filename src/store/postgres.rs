use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::ChatResult;
use crate::models::{Conversation, Message, MessageNotification, ParticipantRef, Participation};

use super::{ConversationFilters, ConversationSummaryRow, MessageStore, NotificationStore};

const MAX_PAGE_SIZE: i64 = 100;

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn participant_from_row(row: &PgRow) -> Result<ParticipantRef, sqlx::Error> {
    Ok(ParticipantRef {
        kind: row.try_get("participant_type")?,
        id: row.try_get("participant_id")?,
    })
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create_message(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        participation_id: Uuid,
        body: &str,
        message_type: &str,
        data: serde_json::Value,
    ) -> ChatResult<Message> {
        let id = Uuid::new_v4();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO messages (id, conversation_id, participation_id, body, message_type, data) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING created_at",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(participation_id)
        .bind(body)
        .bind(message_type)
        .bind(&data)
        .fetch_one(&mut **tx)
        .await?;

        Ok(Message {
            id,
            conversation_id,
            participation_id,
            body: body.to_string(),
            message_type: message_type.to_string(),
            data,
            created_at,
        })
    }

    async fn touch_conversation(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
    ) -> ChatResult<()> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn conversation(&self, conversation_id: Uuid) -> ChatResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, private, direct_message, created_at, updated_at \
             FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conversation)
    }

    async fn participation(&self, participation_id: Uuid) -> ChatResult<Option<Participation>> {
        let participation = sqlx::query_as::<_, Participation>(
            "SELECT id, conversation_id, participant_type, participant_id, created_at \
             FROM participations WHERE id = $1",
        )
        .bind(participation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participation)
    }

    async fn message(&self, message_id: Uuid) -> ChatResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            "SELECT id, conversation_id, participation_id, body, message_type, data, created_at \
             FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    async fn participants_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
    ) -> ChatResult<Vec<ParticipantRef>> {
        let rows = sqlx::query(
            "SELECT participant_type, participant_id FROM participations \
             WHERE conversation_id = $1 ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter()
            .map(|row| participant_from_row(row).map_err(Into::into))
            .collect()
    }

    async fn participants(&self, conversation_id: Uuid) -> ChatResult<Vec<ParticipantRef>> {
        let rows = sqlx::query(
            "SELECT participant_type, participant_id FROM participations \
             WHERE conversation_id = $1 ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| participant_from_row(row).map_err(Into::into))
            .collect()
    }
}

pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, message_id, conversation_id, participant_type, \
     participant_id, is_sender, is_seen, flagged, is_deleted, created_at, updated_at";

/// Build the summary join for one participant. `$1`/`$2` are the participant
/// pair; optional conversation filters claim the next placeholders, and
/// limit/offset always come last.
fn summary_sql(filters: &ConversationFilters) -> String {
    let mut clauses: Vec<String> = Vec::new();
    let mut next = 3;
    if filters.private.is_some() {
        clauses.push(format!("c.private = ${next}"));
        next += 1;
    }
    if filters.direct_message.is_some() {
        clauses.push(format!("c.direct_message = ${next}"));
        next += 1;
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("\nWHERE {}", clauses.join(" AND "))
    };

    let (unread_col, unread_join) = if filters.include_unread_count {
        (
            ",\n       uc.unread_count",
            "\nLEFT JOIN LATERAL (\n    SELECT COUNT(*) AS unread_count\n    FROM message_notifications u\n    WHERE u.conversation_id = c.id\n      AND u.participant_type = $1\n      AND u.participant_id = $2\n      AND NOT u.is_seen\n      AND NOT u.is_deleted\n) uc ON TRUE",
        )
    } else {
        ("", "")
    };

    format!(
        "SELECT c.id, c.private, c.direct_message, c.created_at, c.updated_at,\n       \
         lm.id AS last_message_id,\n       \
         lm.participation_id AS last_message_participation_id,\n       \
         lm.body AS last_message_body,\n       \
         lm.message_type AS last_message_type,\n       \
         lm.data AS last_message_data,\n       \
         lm.created_at AS last_message_created_at{unread_col}\n\
         FROM conversations c\n\
         JOIN participations p\n  ON p.conversation_id = c.id\n AND p.participant_type = $1\n AND p.participant_id = $2\n\
         LEFT JOIN LATERAL (\n    \
         SELECT m.id, m.participation_id, m.body, m.message_type, m.data, m.created_at\n    \
         FROM messages m\n    \
         JOIN message_notifications n\n      ON n.message_id = m.id\n     AND n.participant_type = $1\n     AND n.participant_id = $2\n     AND NOT n.is_deleted\n    \
         WHERE m.conversation_id = c.id\n    \
         ORDER BY m.created_at DESC, m.id DESC\n    \
         LIMIT 1\n) lm ON TRUE{unread_join}{where_sql}\n\
         ORDER BY c.updated_at DESC, c.id DESC\n\
         LIMIT ${limit_idx} OFFSET ${offset_idx}",
        limit_idx = next,
        offset_idx = next + 1,
    )
}

fn summary_from_row(
    row: &PgRow,
    include_unread: bool,
) -> Result<ConversationSummaryRow, sqlx::Error> {
    let conversation = Conversation {
        id: row.try_get("id")?,
        private: row.try_get("private")?,
        direct_message: row.try_get("direct_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };

    let last_message = match row.try_get::<Option<Uuid>, _>("last_message_id")? {
        Some(message_id) => Some(Message {
            id: message_id,
            conversation_id: conversation.id,
            participation_id: row.try_get("last_message_participation_id")?,
            body: row.try_get("last_message_body")?,
            message_type: row.try_get("last_message_type")?,
            data: row.try_get("last_message_data")?,
            created_at: row.try_get("last_message_created_at")?,
        }),
        None => None,
    };

    let unread_count = if include_unread {
        Some(row.try_get("unread_count")?)
    } else {
        None
    };

    Ok(ConversationSummaryRow {
        conversation,
        last_message,
        unread_count,
    })
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create_for_participants(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message: &Message,
        participants: &[ParticipantRef],
        sender: &ParticipantRef,
    ) -> ChatResult<()> {
        for participant in participants {
            sqlx::query(
                "INSERT INTO message_notifications \
                 (id, message_id, conversation_id, participant_type, participant_id, is_sender) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(message.id)
            .bind(message.conversation_id)
            .bind(&participant.kind)
            .bind(participant.id)
            .bind(participant == sender)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn find(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<Option<MessageNotification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM message_notifications \
             WHERE message_id = $1 AND participant_type = $2 AND participant_id = $3 \
             AND NOT is_deleted",
        );
        let notification = sqlx::query_as::<_, MessageNotification>(&sql)
            .bind(message_id)
            .bind(&participant.kind)
            .bind(participant.id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(notification)
    }

    async fn soft_delete(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<u64> {
        // Serialize concurrent deletes for the same message; without this two
        // simultaneous last-deleters can each see the other's row as still
        // active and neither reports the transition to zero.
        sqlx::query("SELECT id FROM messages WHERE id = $1 FOR UPDATE")
            .bind(message_id)
            .fetch_optional(&mut **tx)
            .await?;

        let result = sqlx::query(
            "UPDATE message_notifications SET is_deleted = TRUE, updated_at = NOW() \
             WHERE message_id = $1 AND participant_type = $2 AND participant_id = $3 \
             AND NOT is_deleted",
        )
        .bind(message_id)
        .bind(&participant.kind)
        .bind(participant.id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_active_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        message_id: Uuid,
    ) -> ChatResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_notifications WHERE message_id = $1 AND NOT is_deleted",
        )
        .bind(message_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    async fn count_active(&self, message_id: Uuid) -> ChatResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_notifications WHERE message_id = $1 AND NOT is_deleted",
        )
        .bind(message_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_read(&self, message_id: Uuid, participant: &ParticipantRef) -> ChatResult<u64> {
        let result = sqlx::query(
            "UPDATE message_notifications SET is_seen = TRUE, updated_at = NOW() \
             WHERE message_id = $1 AND participant_type = $2 AND participant_id = $3 \
             AND NOT is_deleted",
        )
        .bind(message_id)
        .bind(&participant.kind)
        .bind(participant.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn mark_read_all(
        &self,
        conversation_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<u64> {
        let result = sqlx::query(
            "UPDATE message_notifications SET is_seen = TRUE, updated_at = NOW() \
             WHERE conversation_id = $1 AND participant_type = $2 AND participant_id = $3 \
             AND NOT is_seen AND NOT is_deleted",
        )
        .bind(conversation_id)
        .bind(&participant.kind)
        .bind(participant.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn toggle_flag(
        &self,
        message_id: Uuid,
        participant: &ParticipantRef,
    ) -> ChatResult<Option<bool>> {
        let flagged: Option<bool> = sqlx::query_scalar(
            "UPDATE message_notifications SET flagged = NOT flagged, updated_at = NOW() \
             WHERE message_id = $1 AND participant_type = $2 AND participant_id = $3 \
             AND NOT is_deleted \
             RETURNING flagged",
        )
        .bind(message_id)
        .bind(&participant.kind)
        .bind(participant.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(flagged)
    }

    async fn flagged(&self, message_id: Uuid, participant: &ParticipantRef) -> ChatResult<bool> {
        let flagged: bool = sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM message_notifications \
                WHERE message_id = $1 AND participant_type = $2 AND participant_id = $3 \
                AND flagged AND NOT is_deleted)",
        )
        .bind(message_id)
        .bind(&participant.kind)
        .bind(participant.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(flagged)
    }

    async fn count_unread(&self, participant: &ParticipantRef) -> ChatResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_notifications \
             WHERE participant_type = $1 AND participant_id = $2 \
             AND NOT is_seen AND NOT is_deleted",
        )
        .bind(&participant.kind)
        .bind(participant.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn conversation_summaries(
        &self,
        participant: &ParticipantRef,
        filters: &ConversationFilters,
        limit: i64,
        offset: i64,
    ) -> ChatResult<Vec<ConversationSummaryRow>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = offset.max(0);

        let sql = summary_sql(filters);
        let mut query = sqlx::query(&sql)
            .bind(&participant.kind)
            .bind(participant.id);
        if let Some(private) = filters.private {
            query = query.bind(private);
        }
        if let Some(direct_message) = filters.direct_message {
            query = query.bind(direct_message);
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| summary_from_row(row, filters.include_unread_count).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_sql_without_filters_has_no_where_clause() {
        let sql = summary_sql(&ConversationFilters::default());
        assert!(!sql.contains("WHERE c."));
        assert!(!sql.contains("unread_count"));
        assert!(sql.contains("LIMIT $3 OFFSET $4"));
        assert!(sql.contains("ORDER BY c.updated_at DESC, c.id DESC"));
    }

    #[test]
    fn summary_sql_numbers_filter_placeholders_in_order() {
        let filters = ConversationFilters {
            private: Some(true),
            direct_message: Some(false),
            include_unread_count: false,
        };
        let sql = summary_sql(&filters);
        assert!(sql.contains("c.private = $3"));
        assert!(sql.contains("c.direct_message = $4"));
        assert!(sql.contains("LIMIT $5 OFFSET $6"));
    }

    #[test]
    fn summary_sql_attaches_unread_join_only_on_request() {
        let filters = ConversationFilters {
            include_unread_count: true,
            ..Default::default()
        };
        let sql = summary_sql(&filters);
        assert!(sql.contains("uc.unread_count"));
        assert!(sql.contains("NOT u.is_seen"));
        assert!(sql.contains("LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn summary_sql_last_message_join_excludes_deleted_rows() {
        let sql = summary_sql(&ConversationFilters::default());
        assert!(sql.contains("NOT n.is_deleted"));
        assert!(sql.contains("ORDER BY m.created_at DESC, m.id DESC"));
    }
}
