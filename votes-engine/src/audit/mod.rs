//! Read-only consistency check of entity counters.
//!
//! Recomputes each entity's counts from its vote records and reports the
//! entities whose stored counters disagree. Nothing is repaired.
use std::sync::Arc;

use tracing::{info, instrument, warn};
use votes_repository::{VotesRepository, VotesRepositoryError};
use votes_shared::types::{CounterDrift, EntityId};

pub struct CounterAuditor {
    repository: Arc<dyn VotesRepository>,
}

impl CounterAuditor {
    pub fn new(repository: Arc<dyn VotesRepository>) -> Self {
        Self { repository }
    }

    /// Audits the given entities. Unknown entity ids are skipped.
    #[instrument(skip_all, fields(entities = entity_ids.len()))]
    pub async fn audit(&self, entity_ids: &[EntityId]) -> Result<Vec<CounterDrift>, VotesRepositoryError> {
        let mut drifts = Vec::new();

        for entity_id in entity_ids {
            let Some(aggregate) = self.repository.get_aggregate(*entity_id).await? else {
                warn!(%entity_id, "Skipping unknown entity");
                continue;
            };
            let actual = self.repository.count_votes(*entity_id).await?;
            if actual != aggregate.counts {
                warn!(%entity_id, stored = ?aggregate.counts, actual = ?actual, "Counter drift detected");
                drifts.push(CounterDrift {
                    entity_id: *entity_id,
                    stored: aggregate.counts,
                    actual,
                });
            }
        }

        info!(drifted = drifts.len(), "Counter audit finished");
        Ok(drifts)
    }

    /// Audits every entity in the store.
    pub async fn audit_all(&self) -> Result<Vec<CounterDrift>, VotesRepositoryError> {
        let entity_ids = self.repository.list_entity_ids().await?;
        self.audit(&entity_ids).await
    }
}
