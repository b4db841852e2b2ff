use serde::{Deserialize, Serialize};
use crate::types::{EntityId, UserId, VoteCategory, VoteKey};

/// Represents a user's vote on an entity.
///
/// Exactly one record may exist per `(entity_id, user_id)` pair. The category is
/// overwritten in place when the user changes their vote or when a migration
/// relabels it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteRecord {
    pub entity_id: EntityId,
    pub user_id: UserId,
    pub category: VoteCategory,
    /// Unix timestamp (seconds) of the first vote.
    pub created_at: i64,
}

impl VoteRecord {
    pub fn key(&self) -> VoteKey {
        VoteKey::new(self.entity_id, self.user_id.clone())
    }
}
