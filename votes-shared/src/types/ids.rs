use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a voted-on protest or boycott.
pub type EntityId = Uuid;

/// Opaque identifier of a voter. Only equality matters.
pub type UserId = String;

/// Composite key of a vote record: at most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteKey {
    pub entity_id: EntityId,
    pub user_id: UserId,
}

impl VoteKey {
    pub fn new(entity_id: EntityId, user_id: impl Into<UserId>) -> Self {
        Self {
            entity_id,
            user_id: user_id.into(),
        }
    }
}
