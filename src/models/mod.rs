pub mod conversation;
pub mod message;
pub mod notification;
pub mod participant;
pub mod participation;

pub use conversation::Conversation;
pub use message::Message;
pub use notification::MessageNotification;
pub use participant::ParticipantRef;
pub use participation::Participation;
