use thiserror::Error;
use uuid::Uuid;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("conversation {0} not found")]
    ConversationNotFound(Uuid),

    #[error("participation {0} not found")]
    ParticipationNotFound(Uuid),

    #[error("sender is not a participant of conversation {conversation_id}")]
    ParticipantNotAuthorized { conversation_id: Uuid },

    #[error("no active notification for message {message_id}")]
    NotificationNotFound { message_id: Uuid },

    #[error("store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    /// Returns whether this error is retryable (e.g., database connection timeout).
    /// Retry policy belongs to the store layer; this crate never retries itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Store(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            _ => false,
        }
    }
}
