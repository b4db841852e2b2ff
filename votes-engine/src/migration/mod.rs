//! This module defines the `MigrationService`, which renames a vote category
//! across all stored vote records and moves the matching counts between the
//! counters of every affected entity.
//!
//! A run has three steps:
//!
//! 1. Discovery: every record carrying the old category is fetched.
//! 2. Relabel: the records are rewritten in bounded batches, each committed
//!    atomically. A failed batch is reported and the run moves on.
//! 3. Reconcile: for each entity with relabeled records, the relabeled count is
//!    moved from the old counter to the new one, again in bounded batches.
//!
//! Only relabels confirmed by a committed batch are moved between counters.
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{info, instrument, warn};
use votes_repository::MigrationRepository;
use votes_shared::types::{
    CategoryMigration, CounterAdjustment, EntityId, MigrationFailure, MigrationPhase,
    MigrationPreview, MigrationSummary, VoteCategory, VoteKey,
};
use crate::batching::{BatchLimit, BatchPlan};
use crate::config::VoteEngineConfig;
use crate::errors::{ConfigError, MigrationError};

/// `MigrationService` runs bulk category migrations against a store.
pub struct MigrationService {
    repository: Arc<dyn MigrationRepository>,
    config: VoteEngineConfig,
}

impl MigrationService {
    /// Creates a new `MigrationService`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration is unusable.
    pub fn new(
        repository: Arc<dyn MigrationRepository>,
        config: VoteEngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { repository, config })
    }

    /// The batch size actually used against this store.
    pub fn batch_limit(&self) -> Result<BatchLimit, ConfigError> {
        BatchLimit::capped(self.config.max_batch_size, self.repository.max_write_batch())
    }

    fn validate(&self, from: VoteCategory, to: VoteCategory) -> Result<CategoryMigration, MigrationError> {
        let migration = CategoryMigration::new(from, to);
        if migration.is_identity() {
            return Err(MigrationError::SameCategory(from));
        }
        Ok(migration)
    }

    /// Moves every vote from category `from` to category `to`.
    ///
    /// Batch and entity failures do not abort the run; they are tallied in the
    /// returned summary. Running the same migration again only picks up records
    /// that still carry `from`.
    ///
    /// # Returns
    ///
    /// * `Ok(MigrationSummary)` - The run completed, possibly with failures
    /// * `Err(MigrationError)` - The run could not start
    #[instrument(skip(self))]
    pub async fn migrate_category(
        &self,
        from: VoteCategory,
        to: VoteCategory,
    ) -> Result<MigrationSummary, MigrationError> {
        let migration = self.validate(from, to)?;
        let limit = self.batch_limit()?;

        let candidates = self
            .repository
            .find_votes_by_category(from)
            .await
            .map_err(MigrationError::Discovery)?;

        let mut summary = MigrationSummary::empty(migration);
        if candidates.is_empty() {
            info!(%migration, "No votes to migrate");
            return Ok(summary);
        }
        summary.candidate_record_count = candidates.len();
        info!(%migration, candidates = candidates.len(), batch_limit = limit.get(), "Starting category migration");

        let keys: Vec<VoteKey> = candidates.iter().map(|record| record.key()).collect();
        let migrated_by_entity = self
            .relabel(BatchPlan::new(keys, limit), migration, &mut summary)
            .await;
        self.reconcile(migrated_by_entity, migration, limit, &mut summary)
            .await;

        if summary.is_clean() {
            info!(%summary, "Category migration completed");
        } else {
            warn!(%summary, failures = summary.failures.len(), "Category migration completed with failures");
        }
        Ok(summary)
    }

    /// Relabels the planned records batch by batch.
    ///
    /// Returns the number of confirmed relabels per entity.
    async fn relabel(
        &self,
        plan: BatchPlan<VoteKey>,
        migration: CategoryMigration,
        summary: &mut MigrationSummary,
    ) -> BTreeMap<EntityId, i64> {
        let mut migrated_by_entity: BTreeMap<EntityId, i64> = BTreeMap::new();

        for batch in plan.batches() {
            match self.repository.relabel_votes(batch.items, migration).await {
                Ok(relabeled) => {
                    summary.migrated_record_count += relabeled.len();
                    summary.skipped_record_count += batch.len() - relabeled.len();
                    for key in relabeled {
                        *migrated_by_entity.entry(key.entity_id).or_default() += 1;
                    }
                }
                Err(err) => {
                    warn!(batch = batch.index, items = batch.len(), error = %err, "Relabel batch failed");
                    summary.failed_record_count += batch.len();
                    summary.failures.push(MigrationFailure::BatchCommitFailure {
                        phase: MigrationPhase::Relabel,
                        batch: batch.index,
                        items: batch.len(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        migrated_by_entity
    }

    /// Moves the confirmed relabel counts between the counters of each entity.
    async fn reconcile(
        &self,
        migrated_by_entity: BTreeMap<EntityId, i64>,
        migration: CategoryMigration,
        limit: BatchLimit,
        summary: &mut MigrationSummary,
    ) {
        let entity_ids: Vec<EntityId> = migrated_by_entity.keys().copied().collect();
        let plan = BatchPlan::new(entity_ids, limit);

        for batch in plan.batches() {
            let existing: HashSet<EntityId> = match self.repository.get_aggregates(batch.items).await {
                Ok(aggregates) => aggregates.into_iter().map(|aggregate| aggregate.entity_id).collect(),
                Err(err) => {
                    self.fail_reconcile_batch(batch.index, batch.len(), err.to_string(), summary);
                    continue;
                }
            };

            let mut adjustments = Vec::with_capacity(batch.len());
            for entity_id in batch.items {
                let amount = migrated_by_entity.get(entity_id).copied().unwrap_or_default();
                if existing.contains(entity_id) {
                    adjustments.push(CounterAdjustment {
                        entity_id: *entity_id,
                        from: migration.from,
                        to: migration.to,
                        amount,
                    });
                } else {
                    warn!(%entity_id, records = amount, "Entity missing during reconciliation");
                    summary.failed_entities += 1;
                    summary.orphaned_record_count += amount as usize;
                    summary.failures.push(MigrationFailure::EntityMissingDuringReconciliation {
                        entity_id: *entity_id,
                        records: amount as usize,
                    });
                }
            }

            if adjustments.is_empty() {
                continue;
            }
            match self.repository.adjust_counters(&adjustments).await {
                Ok(()) => summary.reconciled_entities += adjustments.len(),
                Err(err) => {
                    self.fail_reconcile_batch(batch.index, adjustments.len(), err.to_string(), summary)
                }
            }
        }
    }

    fn fail_reconcile_batch(
        &self,
        batch: usize,
        items: usize,
        reason: String,
        summary: &mut MigrationSummary,
    ) {
        warn!(batch, items, error = %reason, "Reconcile batch failed");
        summary.failed_entities += items;
        summary.failures.push(MigrationFailure::BatchCommitFailure {
            phase: MigrationPhase::Reconcile,
            batch,
            items,
            reason,
        });
    }

    /// Reports what `migrate_category` would do without writing anything.
    #[instrument(skip(self))]
    pub async fn preview(
        &self,
        from: VoteCategory,
        to: VoteCategory,
    ) -> Result<MigrationPreview, MigrationError> {
        let migration = self.validate(from, to)?;
        let limit = self.batch_limit()?;

        let candidates = self
            .repository
            .find_votes_by_category(from)
            .await
            .map_err(MigrationError::Discovery)?;

        let affected_entities: BTreeSet<EntityId> =
            candidates.iter().map(|record| record.entity_id).collect();
        let plan = BatchPlan::new(candidates, limit);

        Ok(MigrationPreview {
            migration,
            candidate_record_count: plan.len(),
            affected_entities: affected_entities.len(),
            planned_batches: plan.batch_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use uuid::Uuid;
    use votes_repository::{InMemoryVotesRepository, VotesRepository, VotesRepositoryError};
    use votes_shared::types::{EntityAggregate, VoteCounts, VoteRecord};

    /// Mock store wrapping the in-memory repository with switchable failures.
    struct MockMigrationRepository {
        inner: InMemoryVotesRepository,
        fail_relabel_batches: HashSet<usize>,
        should_fail_discovery: bool,
        should_fail_adjust: bool,
        relabel_calls: Mutex<usize>,
        remove_before_reconcile: Option<EntityId>,
    }

    impl MockMigrationRepository {
        fn new(inner: InMemoryVotesRepository) -> Self {
            Self {
                inner,
                fail_relabel_batches: HashSet::new(),
                should_fail_discovery: false,
                should_fail_adjust: false,
                relabel_calls: Mutex::new(0),
                remove_before_reconcile: None,
            }
        }
    }

    #[async_trait]
    impl MigrationRepository for MockMigrationRepository {
        fn max_write_batch(&self) -> usize {
            self.inner.max_write_batch()
        }

        async fn find_votes_by_category(
            &self,
            category: VoteCategory,
        ) -> Result<Vec<VoteRecord>, VotesRepositoryError> {
            if self.should_fail_discovery {
                return Err(VotesRepositoryError::unavailable("discovery query timed out"));
            }
            self.inner.find_votes_by_category(category).await
        }

        async fn relabel_votes(
            &self,
            keys: &[VoteKey],
            migration: CategoryMigration,
        ) -> Result<Vec<VoteKey>, VotesRepositoryError> {
            let call = {
                let mut calls = self.relabel_calls.lock().unwrap();
                *calls += 1;
                *calls - 1
            };
            if self.fail_relabel_batches.contains(&call) {
                return Err(VotesRepositoryError::unavailable("batch commit rejected"));
            }
            self.inner.relabel_votes(keys, migration).await
        }

        async fn get_aggregates(
            &self,
            entity_ids: &[EntityId],
        ) -> Result<Vec<EntityAggregate>, VotesRepositoryError> {
            if let Some(entity_id) = self.remove_before_reconcile {
                self.inner.remove_entity(entity_id).await;
            }
            self.inner.get_aggregates(entity_ids).await
        }

        async fn adjust_counters(
            &self,
            adjustments: &[CounterAdjustment],
        ) -> Result<(), VotesRepositoryError> {
            if self.should_fail_adjust {
                return Err(VotesRepositoryError::unavailable("counter batch rejected"));
            }
            self.inner.adjust_counters(adjustments).await
        }
    }

    /// Seeds `oppose` votes spread over the given entities.
    async fn seed_oppose_votes(store: &InMemoryVotesRepository, per_entity: &[(EntityId, usize)]) {
        for (entity_id, votes) in per_entity {
            store.add_entity(*entity_id, VoteCounts::new(0, *votes as i64, 0)).await;
            for i in 0..*votes {
                store
                    .put_vote(VoteRecord {
                        entity_id: *entity_id,
                        user_id: format!("user-{i}"),
                        category: VoteCategory::Oppose,
                        created_at: 1713859200,
                    })
                    .await;
            }
        }
    }

    fn service(repository: Arc<MockMigrationRepository>, max_batch_size: usize) -> MigrationService {
        MigrationService::new(repository, VoteEngineConfig::default().with_max_batch_size(max_batch_size)).unwrap()
    }

    #[tokio::test]
    async fn test_same_category_is_rejected() {
        let repository = Arc::new(MockMigrationRepository::new(InMemoryVotesRepository::new()));
        let service = service(repository, 10);

        let err = service
            .migrate_category(VoteCategory::Support, VoteCategory::Support)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::SameCategory(VoteCategory::Support)));
    }

    #[tokio::test]
    async fn test_discovery_failure_fails_the_call() {
        let mut mock = MockMigrationRepository::new(InMemoryVotesRepository::new());
        mock.should_fail_discovery = true;
        let service = service(Arc::new(mock), 10);

        let err = service
            .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::Discovery(_)));
    }

    #[tokio::test]
    async fn test_nothing_to_migrate_returns_zero_summary() {
        let repository = Arc::new(MockMigrationRepository::new(InMemoryVotesRepository::new()));
        let service = service(repository, 10);

        let summary = service
            .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
            .await
            .unwrap();

        assert_eq!(summary, MigrationSummary::empty(CategoryMigration::OPPOSE_TO_OPPOSITION));
        assert_eq!(summary.message(), "0 success, 0 failed");
    }

    #[tokio::test]
    async fn test_failed_relabel_batch_is_contained() {
        let store = InMemoryVotesRepository::new();
        let entity_id = Uuid::new_v4();
        seed_oppose_votes(&store, &[(entity_id, 7)]).await;

        let mut mock = MockMigrationRepository::new(store);
        mock.fail_relabel_batches.insert(1);
        let repository = Arc::new(mock);
        let service = service(repository.clone(), 3);

        let summary = service
            .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
            .await
            .unwrap();

        assert_eq!(summary.candidate_record_count, 7);
        assert_eq!(summary.migrated_record_count, 4);
        assert_eq!(summary.failed_record_count, 3);
        assert_eq!(summary.message(), "4 success, 3 failed");
        assert_eq!(
            summary.failures,
            vec![MigrationFailure::BatchCommitFailure {
                phase: MigrationPhase::Relabel,
                batch: 1,
                items: 3,
                reason: "Store unavailable: batch commit rejected".to_string(),
            }]
        );

        // Only the committed relabels moved between counters.
        let counts = repository.inner.get_aggregate(entity_id).await.unwrap().unwrap().counts;
        assert_eq!(counts, VoteCounts::new(0, 3, 4));
        assert_eq!(repository.inner.count_votes(entity_id).await.unwrap(), counts);
    }

    #[tokio::test]
    async fn test_rerun_after_partial_failure_completes_migration() {
        let store = InMemoryVotesRepository::new();
        let entity_id = Uuid::new_v4();
        seed_oppose_votes(&store, &[(entity_id, 5)]).await;

        let mut mock = MockMigrationRepository::new(store);
        mock.fail_relabel_batches.insert(0);
        let repository = Arc::new(mock);
        let service = service(repository.clone(), 2);

        let first = service.migrate_category(VoteCategory::Oppose, VoteCategory::Opposition).await.unwrap();
        let second = service.migrate_category(VoteCategory::Oppose, VoteCategory::Opposition).await.unwrap();

        assert_eq!(first.failed_record_count, 2);
        assert_eq!(second.candidate_record_count, 2);
        assert_eq!(second.migrated_record_count, 2);
        assert!(second.is_clean());
        let counts = repository.inner.get_aggregate(entity_id).await.unwrap().unwrap().counts;
        assert_eq!(counts, VoteCounts::new(0, 0, 5));
    }

    #[tokio::test]
    async fn test_missing_entity_is_reported_and_others_reconciled() {
        let store = InMemoryVotesRepository::new();
        let kept = Uuid::new_v4();
        let deleted = Uuid::new_v4();
        seed_oppose_votes(&store, &[(kept, 2), (deleted, 3)]).await;

        let mut mock = MockMigrationRepository::new(store);
        mock.remove_before_reconcile = Some(deleted);
        let repository = Arc::new(mock);
        let service = service(repository.clone(), 10);

        let summary = service
            .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
            .await
            .unwrap();

        assert_eq!(summary.migrated_record_count, 5);
        assert_eq!(summary.reconciled_entities, 1);
        assert_eq!(summary.failed_entities, 1);
        assert_eq!(summary.orphaned_record_count, 3);
        assert!(summary.failures.contains(&MigrationFailure::EntityMissingDuringReconciliation {
            entity_id: deleted,
            records: 3,
        }));
        let counts = repository.inner.get_aggregate(kept).await.unwrap().unwrap().counts;
        assert_eq!(counts, VoteCounts::new(0, 0, 2));
    }

    #[tokio::test]
    async fn test_failed_adjust_batch_marks_entities_failed() {
        let store = InMemoryVotesRepository::new();
        seed_oppose_votes(&store, &[(Uuid::new_v4(), 1), (Uuid::new_v4(), 1)]).await;

        let mut mock = MockMigrationRepository::new(store);
        mock.should_fail_adjust = true;
        let service = service(Arc::new(mock), 10);

        let summary = service
            .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
            .await
            .unwrap();

        assert_eq!(summary.migrated_record_count, 2);
        assert_eq!(summary.reconciled_entities, 0);
        assert_eq!(summary.failed_entities, 2);
        assert!(!summary.is_clean());
    }

    #[tokio::test]
    async fn test_batch_limit_is_capped_by_store() {
        let store = InMemoryVotesRepository::with_max_write_batch(4);
        let entity_id = Uuid::new_v4();
        seed_oppose_votes(&store, &[(entity_id, 9)]).await;
        let repository = Arc::new(MockMigrationRepository::new(store));
        let service = service(repository.clone(), 1000);

        assert_eq!(service.batch_limit().unwrap().get(), 4);
        let summary = service
            .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
            .await
            .unwrap();

        assert_eq!(summary.migrated_record_count, 9);
        assert_eq!(*repository.relabel_calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let store = InMemoryVotesRepository::new();
        seed_oppose_votes(&store, &[(Uuid::new_v4(), 3), (Uuid::new_v4(), 4)]).await;
        let repository = Arc::new(MockMigrationRepository::new(store));
        let service = service(repository.clone(), 3);

        let preview = service
            .preview(VoteCategory::Oppose, VoteCategory::Opposition)
            .await
            .unwrap();

        assert_eq!(preview.candidate_record_count, 7);
        assert_eq!(preview.affected_entities, 2);
        assert_eq!(preview.planned_batches, 3);
        assert_eq!(*repository.relabel_calls.lock().unwrap(), 0);
        assert_eq!(repository.inner.find_votes_by_category(VoteCategory::Oppose).await.unwrap().len(), 7);
    }
}
