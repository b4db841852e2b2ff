//! Error types for engine configuration.
use thiserror::Error;

/// Represents an engine configuration that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A batch limit of zero, or one above what the store accepts.
    #[error("Invalid batch size {requested}: must be between 1 and {cap}")]
    InvalidBatchSize { requested: usize, cap: usize },

    #[error("Invalid vote attempt budget: at least one attempt is required")]
    InvalidVoteAttempts,
}
