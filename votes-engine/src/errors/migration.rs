//! Error types for bulk category migrations.
//!
//! Only failures that prevent a run from starting end up here. Failures of
//! individual batches or entities are reported inside the `MigrationSummary`.
use thiserror::Error;
use votes_repository::VotesRepositoryError;
use votes_shared::types::VoteCategory;
use crate::errors::ConfigError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Cannot migrate category {0} onto itself")]
    SameCategory(VoteCategory),

    #[error("Discovery query failed: {0}")]
    Discovery(#[source] VotesRepositoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
