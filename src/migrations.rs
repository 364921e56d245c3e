use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("../migrations/0001_create_conversations.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_participations.sql");
const MIG_0003: &str = include_str!("../migrations/0003_create_messages.sql");
const MIG_0004: &str = include_str!("../migrations/0004_create_message_notifications.sql");

/// Apply all migrations in order. Statements use IF NOT EXISTS, so reapplying
/// against an already-migrated database is a no-op.
pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    for (i, sql) in [MIG_0001, MIG_0002, MIG_0003, MIG_0004]
        .into_iter()
        .enumerate()
    {
        sqlx::raw_sql(sql).execute(db).await?;
        tracing::debug!(migration = i + 1, "chat-core migration applied");
    }
    Ok(())
}
