//! In-memory implementation of the votes repository.
//!
//! Holds users, entity counters and vote records behind a single async mutex,
//! so every trait method observes and mutates a consistent snapshot. It honours
//! the same preconditions and batch limit as the PostgreSQL backend and is used
//! by the engine tests and for local experiments.
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use votes_shared::types::{
    CategoryMigration, CounterAdjustment, EntityAggregate, EntityId, RecordWrite, UserId,
    VoteCategory, VoteChangeset, VoteCounts, VoteKey, VoteRecord,
};
use crate::{MigrationRepository, VotesRepository, VotesRepositoryError, MAX_WRITE_BATCH};

#[derive(Default)]
struct State {
    users: HashSet<UserId>,
    entities: HashMap<EntityId, EntityAggregate>,
    votes: BTreeMap<VoteKey, VoteRecord>,
}

pub struct InMemoryVotesRepository {
    state: Mutex<State>,
    max_write_batch: usize,
}

impl Default for InMemoryVotesRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVotesRepository {
    pub fn new() -> Self {
        Self::with_max_write_batch(MAX_WRITE_BATCH)
    }

    /// Creates a store that rejects batches larger than `max_write_batch`.
    pub fn with_max_write_batch(max_write_batch: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_write_batch,
        }
    }

    pub async fn add_user(&self, user_id: impl Into<UserId>) {
        self.state.lock().await.users.insert(user_id.into());
    }

    /// Creates (or replaces) an entity with the given counters.
    pub async fn add_entity(&self, entity_id: EntityId, counts: VoteCounts) {
        self.state.lock().await.entities.insert(
            entity_id,
            EntityAggregate {
                entity_id,
                counts,
                version: 0,
            },
        );
    }

    pub async fn remove_entity(&self, entity_id: EntityId) {
        self.state.lock().await.entities.remove(&entity_id);
    }

    /// Stores a vote record without touching any counter.
    ///
    /// Used to seed historical records, including deprecated categories.
    pub async fn put_vote(&self, record: VoteRecord) {
        self.state.lock().await.votes.insert(record.key(), record);
    }

    /// Every stored record, ordered by key.
    pub async fn votes(&self) -> Vec<VoteRecord> {
        self.state.lock().await.votes.values().cloned().collect()
    }

    fn check_batch_size(&self, size: usize) -> Result<(), VotesRepositoryError> {
        if size > self.max_write_batch {
            return Err(VotesRepositoryError::BatchTooLarge {
                provided: size,
                max: self.max_write_batch,
            });
        }
        Ok(())
    }
}

fn record_conflict(key: &VoteKey) -> VotesRepositoryError {
    VotesRepositoryError::conflict(format!(
        "vote record ({}, {}) changed concurrently",
        key.entity_id, key.user_id
    ))
}

#[async_trait]
impl VotesRepository for InMemoryVotesRepository {
    async fn user_exists(&self, user_id: &str) -> Result<bool, VotesRepositoryError> {
        Ok(self.state.lock().await.users.contains(user_id))
    }

    async fn get_aggregate(
        &self,
        entity_id: EntityId,
    ) -> Result<Option<EntityAggregate>, VotesRepositoryError> {
        Ok(self.state.lock().await.entities.get(&entity_id).cloned())
    }

    async fn get_vote(&self, key: &VoteKey) -> Result<Option<VoteRecord>, VotesRepositoryError> {
        Ok(self.state.lock().await.votes.get(key).cloned())
    }

    async fn commit_vote(&self, changeset: &VoteChangeset) -> Result<(), VotesRepositoryError> {
        let mut state = self.state.lock().await;

        // Check every precondition before mutating anything.
        let version = state
            .entities
            .get(&changeset.entity_id)
            .map(|aggregate| aggregate.version);
        if version != Some(changeset.expected_version) {
            return Err(VotesRepositoryError::conflict(format!(
                "entity {} is no longer at version {}",
                changeset.entity_id, changeset.expected_version
            )));
        }

        let key = changeset.record.key();
        let stored = state.votes.get(&key).map(|record| record.category);
        let record_matches = match &changeset.record {
            RecordWrite::Insert(_) => stored.is_none(),
            RecordWrite::Update { expected, .. } | RecordWrite::Delete { expected, .. } => {
                stored == Some(*expected)
            }
        };
        if !record_matches {
            return Err(record_conflict(&key));
        }

        match &changeset.record {
            RecordWrite::Insert(record) => {
                state.votes.insert(key, record.clone());
            }
            RecordWrite::Update { category, .. } => {
                if let Some(record) = state.votes.get_mut(&key) {
                    record.category = *category;
                }
            }
            RecordWrite::Delete { .. } => {
                state.votes.remove(&key);
            }
        }

        if let Some(aggregate) = state.entities.get_mut(&changeset.entity_id) {
            aggregate.counts = changeset.counts;
            aggregate.version += 1;
        }
        Ok(())
    }

    async fn count_votes(&self, entity_id: EntityId) -> Result<VoteCounts, VotesRepositoryError> {
        let state = self.state.lock().await;
        let mut counts = VoteCounts::default();
        state
            .votes
            .values()
            .filter(|record| record.entity_id == entity_id)
            .for_each(|record| counts.increment(record.category));
        Ok(counts)
    }

    async fn list_entity_ids(&self) -> Result<Vec<EntityId>, VotesRepositoryError> {
        let mut ids: Vec<EntityId> = self.state.lock().await.entities.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl MigrationRepository for InMemoryVotesRepository {
    fn max_write_batch(&self) -> usize {
        self.max_write_batch
    }

    async fn find_votes_by_category(
        &self,
        category: VoteCategory,
    ) -> Result<Vec<VoteRecord>, VotesRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .votes
            .values()
            .filter(|record| record.category == category)
            .cloned()
            .collect())
    }

    async fn relabel_votes(
        &self,
        keys: &[VoteKey],
        migration: CategoryMigration,
    ) -> Result<Vec<VoteKey>, VotesRepositoryError> {
        self.check_batch_size(keys.len())?;

        let mut state = self.state.lock().await;
        let mut relabeled = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = state.votes.get_mut(key) {
                if record.category == migration.from {
                    record.category = migration.to;
                    relabeled.push(key.clone());
                }
            }
        }
        Ok(relabeled)
    }

    async fn get_aggregates(
        &self,
        entity_ids: &[EntityId],
    ) -> Result<Vec<EntityAggregate>, VotesRepositoryError> {
        let state = self.state.lock().await;
        Ok(entity_ids
            .iter()
            .filter_map(|id| state.entities.get(id).cloned())
            .collect())
    }

    async fn adjust_counters(
        &self,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), VotesRepositoryError> {
        self.check_batch_size(adjustments.len())?;

        let mut state = self.state.lock().await;
        let updated = adjustments
            .iter()
            .filter(|adjustment| state.entities.contains_key(&adjustment.entity_id))
            .count();
        if updated != adjustments.len() {
            return Err(VotesRepositoryError::MissingEntities {
                expected: adjustments.len(),
                updated,
            });
        }

        for adjustment in adjustments {
            if let Some(aggregate) = state.entities.get_mut(&adjustment.entity_id) {
                aggregate
                    .counts
                    .transfer(adjustment.from, adjustment.to, adjustment.amount);
                aggregate.version += 1;
            }
        }
        Ok(())
    }
}
