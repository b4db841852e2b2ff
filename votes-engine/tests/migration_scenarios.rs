//! Category migration scenarios run against the in-memory store.

use std::sync::Arc;

use uuid::Uuid;
use votes_engine::{CounterAuditor, MigrationService, VoteEngineConfig, VoteTransactionService};
use votes_repository::{InMemoryVotesRepository, MigrationRepository, VotesRepository};
use votes_shared::types::{EntityId, VoteAction, VoteCategory, VoteCounts, VoteRecord};

async fn seed(store: &InMemoryVotesRepository, entity_id: EntityId, votes: &[(&str, VoteCategory)]) {
    let mut counts = VoteCounts::default();
    for (user, category) in votes {
        store.add_user(*user).await;
        store
            .put_vote(VoteRecord {
                entity_id,
                user_id: user.to_string(),
                category: *category,
                created_at: 1713859200,
            })
            .await;
        counts.increment(*category);
    }
    store.add_entity(entity_id, counts).await;
}

fn oppose_voters(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("voter-{i}")).collect()
}

#[tokio::test]
async fn test_migrates_all_oppose_votes_of_an_entity() {
    let store = Arc::new(InMemoryVotesRepository::new());
    let entity_id = Uuid::new_v4();
    let voters = oppose_voters(10);
    let votes: Vec<(&str, VoteCategory)> = voters.iter().map(|v| (v.as_str(), VoteCategory::Oppose)).collect();
    seed(&store, entity_id, &votes).await;
    let service = MigrationService::new(store.clone(), VoteEngineConfig::default()).unwrap();

    let summary = service
        .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
        .await
        .unwrap();

    assert_eq!(summary.migrated_record_count, 10);
    assert_eq!(summary.failed_record_count, 0);
    assert_eq!(summary.message(), "10 success, 0 failed");
    let counts = store.get_aggregate(entity_id).await.unwrap().unwrap().counts;
    assert_eq!(counts.oppose, 0);
    assert_eq!(counts.opposition, 10);
}

#[tokio::test]
async fn test_migration_leaves_no_old_labels_and_keeps_counters_consistent() {
    let store = Arc::new(InMemoryVotesRepository::new());
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    seed(&store, first, &[("a", VoteCategory::Oppose), ("b", VoteCategory::Support), ("c", VoteCategory::Opposition)]).await;
    seed(&store, second, &[("a", VoteCategory::Oppose), ("d", VoteCategory::Oppose)]).await;
    let config = VoteEngineConfig::default().with_max_batch_size(2);
    let service = MigrationService::new(store.clone(), config).unwrap();

    let summary = service
        .migrate_category(VoteCategory::Oppose, VoteCategory::Opposition)
        .await
        .unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.reconciled_entities, 2);
    assert!(store.find_votes_by_category(VoteCategory::Oppose).await.unwrap().is_empty());
    let drifts = CounterAuditor::new(store.clone()).audit_all().await.unwrap();
    assert!(drifts.is_empty());
    assert_eq!(store.get_aggregate(first).await.unwrap().unwrap().counts, VoteCounts::new(1, 0, 2));
}

#[tokio::test]
async fn test_second_run_finds_nothing() {
    let store = Arc::new(InMemoryVotesRepository::new());
    let entity_id = Uuid::new_v4();
    seed(&store, entity_id, &[("a", VoteCategory::Oppose), ("b", VoteCategory::Oppose)]).await;
    let service = MigrationService::new(store.clone(), VoteEngineConfig::default()).unwrap();

    service.migrate_category(VoteCategory::Oppose, VoteCategory::Opposition).await.unwrap();
    let counts_after_first = store.get_aggregate(entity_id).await.unwrap().unwrap().counts;
    let second = service.migrate_category(VoteCategory::Oppose, VoteCategory::Opposition).await.unwrap();

    assert_eq!(second.candidate_record_count, 0);
    assert_eq!(second.migrated_record_count, 0);
    assert_eq!(second.message(), "0 success, 0 failed");
    assert_eq!(store.get_aggregate(entity_id).await.unwrap().unwrap().counts, counts_after_first);
}

#[tokio::test]
async fn test_migrated_vote_toggles_off_with_new_category() {
    let store = Arc::new(InMemoryVotesRepository::new());
    let entity_id = Uuid::new_v4();
    seed(&store, entity_id, &[("alice", VoteCategory::Oppose)]).await;
    let migration = MigrationService::new(store.clone(), VoteEngineConfig::default()).unwrap();
    let votes = VoteTransactionService::new(store.clone(), VoteEngineConfig::default()).unwrap();

    migration.migrate_category(VoteCategory::Oppose, VoteCategory::Opposition).await.unwrap();
    let outcome = votes.vote(entity_id, "alice", VoteCategory::Opposition).await.unwrap();

    assert_eq!(outcome.action, VoteAction::Removed);
    assert_eq!(outcome.counts, VoteCounts::default());
}

#[tokio::test]
async fn test_audit_detects_drift_left_by_legacy_data() {
    let store = Arc::new(InMemoryVotesRepository::new());
    let entity_id = Uuid::new_v4();
    seed(&store, entity_id, &[("a", VoteCategory::Oppose)]).await;
    // Counter written without its record, as an interrupted job would leave it.
    store.add_entity(entity_id, VoteCounts::new(0, 1, 1)).await;

    let drifts = CounterAuditor::new(store).audit_all().await.unwrap();

    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].actual, VoteCounts::new(0, 1, 0));
}
