use dotenvy::dotenv;
use std::env;

use crate::error::{ChatError, ChatResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Sender fields exposed in `message.sent` payloads. Empty means the full
    /// default projection is used.
    pub sender_fields_whitelist: Vec<String>,
}

impl Config {
    fn parse_fields(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn from_env() -> ChatResult<Self> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ChatError::Config("DATABASE_URL missing".into()))?;
        let sender_fields_whitelist = env::var("CHAT_SENDER_FIELDS")
            .map(|v| Self::parse_fields(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            sender_fields_whitelist,
        })
    }

}
