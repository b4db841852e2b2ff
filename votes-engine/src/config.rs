//! Configuration types for the vote and migration services.
use std::time::Duration;

use votes_repository::MAX_WRITE_BATCH;
use crate::errors::ConfigError;

/// Configuration shared by `VoteTransactionService` and `MigrationService`.
///
/// The effective migration batch size is always capped by the store, so a
/// `max_batch_size` above the store limit is silently lowered.
#[derive(Debug, Clone)]
pub struct VoteEngineConfig {
    /// Maximum number of writes committed in a single migration batch.
    ///
    /// Defaults to 500, the per-batch write limit of the hosted store.
    pub max_batch_size: usize,
    /// Total number of attempts for a vote transaction that keeps conflicting.
    pub max_vote_attempts: usize,
    /// Base delay of the exponential backoff between vote attempts.
    pub retry_base_ms: u64,
}

impl Default for VoteEngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_WRITE_BATCH,
            max_vote_attempts: 5,
            retry_base_ms: 10,
        }
    }
}

impl VoteEngineConfig {
    /// Create a config with a custom migration batch size.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_max_vote_attempts(mut self, max_vote_attempts: usize) -> Self {
        self.max_vote_attempts = max_vote_attempts;
        self
    }

    pub fn with_retry_base_ms(mut self, retry_base_ms: u64) -> Self {
        self.retry_base_ms = retry_base_ms;
        self
    }

    /// Checks the values that do not depend on a particular store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize {
                requested: 0,
                cap: MAX_WRITE_BATCH,
            });
        }
        if self.max_vote_attempts == 0 {
            return Err(ConfigError::InvalidVoteAttempts);
        }
        Ok(())
    }

    /// Upper bound of a single backoff delay.
    pub(crate) fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms.saturating_mul(50).max(1))
    }
}
