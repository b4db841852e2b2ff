//! Error types for live vote transactions.
use thiserror::Error;
use votes_repository::VotesRepositoryError;

/// Represents errors that can occur while casting a vote.
///
/// A vote call that returns an error has written nothing.
#[derive(Debug, Error)]
pub enum VoteError {
    /// The entity or the user does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The category is unknown or no longer accepted for new votes.
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Every attempt collided with a concurrent write.
    #[error("Transaction conflict persisted after {attempts} attempts")]
    TransactionConflict { attempts: usize },

    #[error("Repository error: {0}")]
    Repository(#[from] VotesRepositoryError),
}

impl VoteError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// True for a single lost optimistic write, which is worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Repository(err) if err.is_conflict())
    }
}
