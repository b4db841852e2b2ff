//! This module defines the `VotesRepository` trait, the interface used by live
//! vote transactions to read and atomically write vote records and entity
//! counters.
use votes_shared::types::{EntityAggregate, EntityId, VoteChangeset, VoteCounts, VoteKey, VoteRecord};
use crate::errors::VotesRepositoryError;

/// A trait that defines the interface for live vote transactions.
///
/// Implementors must apply a `VoteChangeset` atomically: the record write and the
/// counter write either both become visible or neither does.
#[async_trait::async_trait]
pub trait VotesRepository: Send + Sync {
    /// Checks whether a voter exists.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Opaque identifier of the voter.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the user is known to the store.
    async fn user_exists(&self, user_id: &str) -> Result<bool, VotesRepositoryError>;

    /// Reads the counter document of an entity.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the entity does not exist.
    async fn get_aggregate(
        &self,
        entity_id: EntityId,
    ) -> Result<Option<EntityAggregate>, VotesRepositoryError>;

    /// Reads the vote record stored under `key`, if any.
    async fn get_vote(&self, key: &VoteKey) -> Result<Option<VoteRecord>, VotesRepositoryError>;

    /// Atomically applies a vote transaction.
    ///
    /// The write is conditional on the aggregate still carrying
    /// `changeset.expected_version` and on the record still being in the state
    /// the changeset was computed from (absent for inserts, holding the expected
    /// category for updates and deletes).
    ///
    /// # Arguments
    ///
    /// * `changeset` - The record write and the new counters of the entity.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Both writes were committed.
    /// * `Err(VotesRepositoryError::Conflict)` - A precondition no longer holds; nothing was written.
    /// * `Err(VotesRepositoryError)` - Any other storage failure; nothing was written.
    async fn commit_vote(&self, changeset: &VoteChangeset) -> Result<(), VotesRepositoryError>;

    /// Counts the vote records of an entity per category.
    ///
    /// Used to audit the stored counters against the records they summarize.
    async fn count_votes(&self, entity_id: EntityId) -> Result<VoteCounts, VotesRepositoryError>;

    /// Lists the identifiers of every entity carrying counters.
    async fn list_entity_ids(&self) -> Result<Vec<EntityId>, VotesRepositoryError>;
}
