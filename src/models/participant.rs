use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Polymorphic participant reference: a kind tag plus an id. Two refs identify
/// the same participant exactly when both components are equal; the pair is
/// the composite key for every notification lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub kind: String,
    pub id: Uuid,
}

impl ParticipantRef {
    pub fn new(kind: impl Into<String>, id: Uuid) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
