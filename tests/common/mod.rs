#![allow(dead_code)]

use std::env;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use chat_core::error::ChatResult;
use chat_core::events::{ChatEvent, DefaultSenderProjector, EventSink};
use chat_core::models::ParticipantRef;
use chat_core::services::{ConversationService, MessageService, ReadFlagService};
use chat_core::store::{MessageStore, NotificationStore, PgMessageStore, PgNotificationStore};

pub fn test_database_url() -> Option<String> {
    env::var("DATABASE_URL").ok()
}

/// Connect to the test database and apply migrations. Returns None (and the
/// calling test passes as a skip) when DATABASE_URL is not exported.
pub async fn test_pool() -> Option<PgPool> {
    let Some(url) = test_database_url() else {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    };
    let pool = chat_core::db::init_pool(&url)
        .await
        .expect("connect test database");
    chat_core::migrations::run_all(&pool)
        .await
        .expect("apply migrations");
    Some(pool)
}

/// Event sink that records published events for assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ChatEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count_of(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

#[async_trait::async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: ChatEvent) -> ChatResult<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

pub struct TestContext {
    pub pool: PgPool,
    pub sink: Arc<RecordingSink>,
    pub messages: MessageService,
    pub read_flags: ReadFlagService,
    pub conversations: ConversationService,
}

pub async fn context() -> Option<TestContext> {
    let pool = test_pool().await?;
    let sink = Arc::new(RecordingSink::default());
    let message_store: Arc<dyn MessageStore> = Arc::new(PgMessageStore::new(pool.clone()));
    let notification_store: Arc<dyn NotificationStore> =
        Arc::new(PgNotificationStore::new(pool.clone()));

    let messages = MessageService::new(
        pool.clone(),
        message_store.clone(),
        notification_store.clone(),
        sink.clone(),
        Arc::new(DefaultSenderProjector::default()),
    );
    let read_flags = ReadFlagService::new(notification_store.clone());
    let conversations = ConversationService::new(message_store, notification_store);

    Some(TestContext {
        pool,
        sink,
        messages,
        read_flags,
        conversations,
    })
}

pub fn participant(kind: &str) -> ParticipantRef {
    ParticipantRef::new(kind, Uuid::new_v4())
}

pub async fn seed_conversation(pool: &PgPool, private: bool, direct_message: bool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO conversations (id, private, direct_message) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(private)
        .bind(direct_message)
        .execute(pool)
        .await
        .expect("seed conversation");
    id
}

pub async fn seed_conversation_with_id(pool: &PgPool, id: Uuid) {
    sqlx::query("INSERT INTO conversations (id) VALUES ($1)")
        .bind(id)
        .execute(pool)
        .await
        .expect("seed conversation");
}

pub async fn set_conversation_updated_at(pool: &PgPool, id: Uuid, updated_at: DateTime<Utc>) {
    sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(updated_at)
        .execute(pool)
        .await
        .expect("set conversation updated_at");
}

pub async fn backdate_message(pool: &PgPool, message_id: Uuid, minutes: i32) {
    sqlx::query("UPDATE messages SET created_at = created_at - make_interval(mins => $2) WHERE id = $1")
        .bind(message_id)
        .bind(minutes)
        .execute(pool)
        .await
        .expect("backdate message");
}

pub async fn seed_participation(
    pool: &PgPool,
    conversation_id: Uuid,
    participant: &ParticipantRef,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO participations (id, conversation_id, participant_type, participant_id) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(conversation_id)
    .bind(&participant.kind)
    .bind(participant.id)
    .execute(pool)
    .await
    .expect("seed participation");
    id
}
