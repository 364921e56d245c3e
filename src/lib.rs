//! # chat-core
//!
//! Per-participant message state for multi-party conversations: sending a
//! message fans one notification row out to every participant, each
//! participant owns independent read/flagged/deleted state for it, and
//! conversation listings aggregate that state (last visible message, unread
//! counts).
//!
//! Conversation creation, membership management, and identity resolution are
//! external collaborators; persistence goes through the [`store`] traits and
//! committed mutations surface as [`events::ChatEvent`]s on an injected
//! [`events::EventSink`].

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{ChatError, ChatResult};
