//! Error types for the votes admin tool.
//! Consolidates errors from configuration, the database, and the engine services.
use votes_engine::errors::{ConfigError, MigrationError};
use votes_repository::VotesRepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Engine configuration error: {0}")]
    EngineConfig(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Repository error: {0}")]
    Repository(#[from] VotesRepositoryError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The run finished but some batches or entities failed.
    #[error("Migration finished with {failures} failures")]
    MigrationIncomplete { failures: usize },
    #[error("Counter drift found on {entities} entities")]
    DriftDetected { entities: usize },
}

impl AdminError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
