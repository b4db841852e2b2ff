//! Error types for the votes repository.
//! Defines specific errors that can occur while reading or writing vote records
//! and entity counters.
use thiserror::Error;
use votes_shared::types::UnknownCategory;

/// Represents errors that can occur within the votes repository.
#[derive(Debug, Error)]
pub enum VotesRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Schema migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A conditional write found the record or aggregate in another state than
    /// the one it was staged against. Nothing was written.
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Invalid vote category: {0}")]
    InvalidCategory(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchTooLarge { provided: usize, max: usize },

    #[error("Counter batch expected {expected} entities but only {updated} exist")]
    MissingEntities { expected: usize, updated: usize },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl VotesRepositoryError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<UnknownCategory> for VotesRepositoryError {
    fn from(err: UnknownCategory) -> Self {
        Self::InvalidCategory(err.0)
    }
}
