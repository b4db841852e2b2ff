use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::types::{CategoryMigration, EntityId, VoteCounts};

/// The two write phases of a category migration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    /// Rewriting the category label of vote records.
    Relabel,
    /// Moving counts between counters of affected entities.
    Reconcile,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationPhase::Relabel => f.write_str("relabel"),
            MigrationPhase::Reconcile => f.write_str("reconcile"),
        }
    }
}

/// A failure recorded by a migration run without aborting it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationFailure {
    /// A whole batch failed to commit; every item in it is counted as failed.
    #[error("{phase} batch {batch} ({items} items) failed to commit: {reason}")]
    BatchCommitFailure {
        phase: MigrationPhase,
        batch: usize,
        items: usize,
        reason: String,
    },
    /// Votes were relabeled for an entity that no longer exists, so its
    /// counters could not be reconciled.
    #[error("entity {entity_id} is missing, {records} relabeled records left unreconciled")]
    EntityMissingDuringReconciliation { entity_id: EntityId, records: usize },
}

/// Summary of a category migration run.
///
/// Carries machine-readable tallies for both phases and the individual
/// failures, so callers can report partial success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationSummary {
    pub migration: CategoryMigration,
    /// Records carrying the old label at discovery time.
    pub candidate_record_count: usize,
    /// Records whose label was rewritten by a committed batch.
    pub migrated_record_count: usize,
    /// Records in batches that failed to commit.
    pub failed_record_count: usize,
    /// Records that no longer carried the old label when their batch committed.
    pub skipped_record_count: usize,
    /// Relabeled records whose entity disappeared before reconciliation.
    pub orphaned_record_count: usize,
    /// Entities whose counters were adjusted.
    pub reconciled_entities: usize,
    /// Entities that were missing or whose adjustment batch failed.
    pub failed_entities: usize,
    pub failures: Vec<MigrationFailure>,
}

impl MigrationSummary {
    /// A summary for a run that found nothing to migrate.
    pub fn empty(migration: CategoryMigration) -> Self {
        Self {
            migration,
            candidate_record_count: 0,
            migrated_record_count: 0,
            failed_record_count: 0,
            skipped_record_count: 0,
            orphaned_record_count: 0,
            reconciled_entities: 0,
            failed_entities: 0,
            failures: Vec::new(),
        }
    }

    /// True when every candidate was relabeled and every entity reconciled.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Short status line for display, e.g. `"10 success, 0 failed"`.
    pub fn message(&self) -> String {
        format!(
            "{} success, {} failed",
            self.migrated_record_count, self.failed_record_count
        )
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "migration {}: {} ({} candidates, {} skipped); entities: {} reconciled, {} failed",
            self.migration,
            self.message(),
            self.candidate_record_count,
            self.skipped_record_count,
            self.reconciled_entities,
            self.failed_entities,
        )
    }
}

/// Dry-run result of a category migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationPreview {
    pub migration: CategoryMigration,
    pub candidate_record_count: usize,
    pub affected_entities: usize,
    pub planned_batches: usize,
}

/// An entity whose stored counters differ from its vote records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterDrift {
    pub entity_id: EntityId,
    pub stored: VoteCounts,
    pub actual: VoteCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_reports_success_and_failure_counts() {
        let summary = MigrationSummary {
            migrated_record_count: 7,
            failed_record_count: 3,
            ..MigrationSummary::empty(CategoryMigration::OPPOSE_TO_OPPOSITION)
        };
        assert_eq!(summary.message(), "7 success, 3 failed");
    }

    #[test]
    fn test_empty_summary_is_clean() {
        assert!(MigrationSummary::empty(CategoryMigration::OPPOSE_TO_OPPOSITION).is_clean());
    }
}
