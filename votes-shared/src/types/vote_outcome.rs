use serde::{Deserialize, Serialize};
use crate::types::VoteCounts;

/// What a single vote call did to the caller's vote record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    /// No previous vote existed; a record was created.
    Added,
    /// A previous vote with another category was overwritten.
    Changed,
    /// The same category was cast again, which withdraws the vote.
    Removed,
}

/// Result of a committed vote transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteOutcome {
    pub action: VoteAction,
    /// The entity's counters as committed by this transaction.
    pub counts: VoteCounts,
}
