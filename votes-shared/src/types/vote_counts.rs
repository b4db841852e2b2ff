use serde::{Deserialize, Serialize};
use crate::types::{EntityId, VoteCategory};

/// Per-category vote counters of a single entity.
///
/// Counters never go below zero: decrements are clamped so that a counter that
/// already drifted below the true record count cannot turn negative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteCounts {
    pub support: i64,
    pub oppose: i64,
    pub opposition: i64,
}

impl VoteCounts {
    pub fn new(support: i64, oppose: i64, opposition: i64) -> Self {
        Self {
            support,
            oppose,
            opposition,
        }
    }

    pub fn get(&self, category: VoteCategory) -> i64 {
        match category {
            VoteCategory::Support => self.support,
            VoteCategory::Oppose => self.oppose,
            VoteCategory::Opposition => self.opposition,
        }
    }

    fn slot(&mut self, category: VoteCategory) -> &mut i64 {
        match category {
            VoteCategory::Support => &mut self.support,
            VoteCategory::Oppose => &mut self.oppose,
            VoteCategory::Opposition => &mut self.opposition,
        }
    }

    pub fn set(&mut self, category: VoteCategory, value: i64) {
        *self.slot(category) = value;
    }

    pub fn increment(&mut self, category: VoteCategory) {
        *self.slot(category) += 1;
    }

    /// Decrements a counter by one, stopping at zero.
    pub fn decrement(&mut self, category: VoteCategory) {
        let slot = self.slot(category);
        *slot = (*slot - 1).max(0);
    }

    /// Moves `amount` votes from one counter to another.
    ///
    /// The source counter is clamped at zero, the target always grows by the
    /// full amount.
    pub fn transfer(&mut self, from: VoteCategory, to: VoteCategory, amount: i64) {
        let source = self.slot(from);
        *source = (*source - amount).max(0);
        *self.slot(to) += amount;
    }

    /// Sum of all counters.
    pub fn total(&self) -> i64 {
        self.support + self.oppose + self.opposition
    }
}

/// The denormalized counter document stored on a voted-on entity.
///
/// `version` is bumped by every counter write and serves as the optimistic
/// concurrency token for vote transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityAggregate {
    pub entity_id: EntityId,
    pub counts: VoteCounts,
    pub version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut counts = VoteCounts::default();
        counts.decrement(VoteCategory::Support);
        assert_eq!(counts.support, 0);
    }

    #[test]
    fn test_transfer_clamps_source_only() {
        let mut counts = VoteCounts::new(0, 3, 2);
        counts.transfer(VoteCategory::Oppose, VoteCategory::Opposition, 5);
        assert_eq!(counts, VoteCounts::new(0, 0, 7));
    }

    #[test]
    fn test_get_matches_increment() {
        let mut counts = VoteCounts::new(5, 0, 3);
        counts.increment(VoteCategory::Opposition);
        assert_eq!(counts.get(VoteCategory::Opposition), 4);
        assert_eq!(counts.total(), 9);
    }
}
