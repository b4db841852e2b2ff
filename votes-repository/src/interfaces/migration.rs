//! This module defines the `MigrationRepository` trait used by bulk category
//! migrations. Every write method commits one bounded batch atomically.
use votes_shared::types::{CategoryMigration, CounterAdjustment, EntityAggregate, EntityId, VoteCategory, VoteKey, VoteRecord};
use crate::errors::VotesRepositoryError;

/// Maximum number of writes the hosted document store accepts in one batch.
pub const MAX_WRITE_BATCH: usize = 500;

/// A trait that defines the bulk operations needed to migrate a vote category.
#[async_trait::async_trait]
pub trait MigrationRepository: Send + Sync {
    /// The largest batch `relabel_votes` and `adjust_counters` accept.
    fn max_write_batch(&self) -> usize {
        MAX_WRITE_BATCH
    }

    /// Finds every vote record currently carrying `category`.
    ///
    /// Records are returned ordered by `(entity_id, user_id)`.
    async fn find_votes_by_category(
        &self,
        category: VoteCategory,
    ) -> Result<Vec<VoteRecord>, VotesRepositoryError>;

    /// Rewrites the category of a batch of records in one atomic commit.
    ///
    /// Only records still carrying `migration.from` are rewritten.
    ///
    /// # Arguments
    ///
    /// * `keys` - Records to relabel; at most `max_write_batch()` of them.
    /// * `migration` - The label mapping to apply.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<VoteKey>)` - The keys that were actually relabeled.
    /// * `Err(VotesRepositoryError)` - The batch was not committed; no record changed.
    async fn relabel_votes(
        &self,
        keys: &[VoteKey],
        migration: CategoryMigration,
    ) -> Result<Vec<VoteKey>, VotesRepositoryError>;

    /// Reads the counter documents of the given entities.
    ///
    /// Missing entities are simply absent from the result.
    async fn get_aggregates(
        &self,
        entity_ids: &[EntityId],
    ) -> Result<Vec<EntityAggregate>, VotesRepositoryError>;

    /// Applies a batch of counter deltas in one atomic commit.
    ///
    /// Each adjustment sets `from = max(0, from - amount)` and
    /// `to = to + amount` on its entity and bumps the entity version.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every adjustment was applied.
    /// * `Err(VotesRepositoryError)` - The batch was not committed; no counter changed.
    async fn adjust_counters(
        &self,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), VotesRepositoryError>;
}
