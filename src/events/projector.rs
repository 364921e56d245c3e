use serde_json::{Map, Value};

use crate::config::Config;
use crate::models::Participation;

/// Strategy for shaping the sender projection embedded in `message.sent`
/// payloads. Injected at construction time; deployments with a richer identity
/// model supply their own implementation.
pub trait SenderProjector: Send + Sync {
    fn project(&self, sender: &Participation) -> Value;
}

/// Default projection: the sender's polymorphic participant pair, optionally
/// narrowed to a configured field whitelist. An empty whitelist exposes the
/// full default field set.
#[derive(Debug, Clone, Default)]
pub struct DefaultSenderProjector {
    whitelist: Vec<String>,
}

impl DefaultSenderProjector {
    pub fn new(whitelist: Vec<String>) -> Self {
        Self { whitelist }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sender_fields_whitelist.clone())
    }
}

impl SenderProjector for DefaultSenderProjector {
    fn project(&self, sender: &Participation) -> Value {
        let mut fields = Map::new();
        fields.insert("participation_id".into(), Value::String(sender.id.to_string()));
        fields.insert(
            "participant_type".into(),
            Value::String(sender.participant_type.clone()),
        );
        fields.insert(
            "participant_id".into(),
            Value::String(sender.participant_id.to_string()),
        );

        if !self.whitelist.is_empty() {
            fields.retain(|key, _| self.whitelist.iter().any(|allowed| allowed == key));
        }

        Value::Object(fields)
    }
}
