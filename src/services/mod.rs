pub mod conversation_service;
pub mod message_service;
pub mod read_flag_service;

pub use conversation_service::{ConversationService, ConversationSummary};
pub use message_service::MessageService;
pub use read_flag_service::ReadFlagService;
