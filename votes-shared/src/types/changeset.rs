use crate::types::{EntityId, VoteCategory, VoteCounts, VoteKey, VoteRecord};

/// The write applied to a single vote record as part of a vote transaction.
///
/// `Update` and `Delete` carry the category that was read, so the store can
/// refuse the write if the record changed underneath the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWrite {
    Insert(VoteRecord),
    Update {
        key: VoteKey,
        expected: VoteCategory,
        category: VoteCategory,
    },
    Delete {
        key: VoteKey,
        expected: VoteCategory,
    },
}

impl RecordWrite {
    pub fn key(&self) -> VoteKey {
        match self {
            RecordWrite::Insert(record) => record.key(),
            RecordWrite::Update { key, .. } | RecordWrite::Delete { key, .. } => key.clone(),
        }
    }
}

/// Represents one atomic vote transaction to be persisted.
///
/// A `VoteChangeset` bundles the record write with the new counters of the
/// owning entity. The store applies both or neither, and only if the entity
/// aggregate still carries `expected_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChangeset {
    pub entity_id: EntityId,
    pub expected_version: i64,
    pub record: RecordWrite,
    pub counts: VoteCounts,
}

/// A counter delta staged by a category migration for one entity.
///
/// Applied inside the store as `from = max(0, from - amount)` and
/// `to = to + amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterAdjustment {
    pub entity_id: EntityId,
    pub from: VoteCategory,
    pub to: VoteCategory,
    pub amount: i64,
}
