//! Dependency initialization and wiring for the votes admin tool.
use std::sync::Arc;

use tracing::info;
use votes_engine::{CounterAuditor, MigrationService};
use votes_repository::PostgresVotesRepository;
use crate::config::Settings;
use crate::errors::AdminError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub migration: MigrationService,
    pub auditor: CounterAuditor,
}

impl Dependencies {
    /// Connects to PostgreSQL, applies the schema migrations and builds the
    /// engine services.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AdminError)` - If the database is unreachable or the settings are invalid
    pub async fn new(settings: &Settings) -> Result<Self, AdminError> {
        let config = settings.engine_config();
        info!(
            max_batch_size = config.max_batch_size,
            max_vote_attempts = config.max_vote_attempts,
            "Initializing dependencies"
        );

        let pool = sqlx::PgPool::connect(&settings.database_url).await?;
        let repository = Arc::new(PostgresVotesRepository::new(pool).await?);
        repository.run_migrations().await?;
        info!("Database schema ready");

        let migration = MigrationService::new(repository.clone(), config)?;
        let auditor = CounterAuditor::new(repository);

        Ok(Self { migration, auditor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dependencies_new_invalid_database_url() {
        let settings = Settings {
            database_url: "invalid-database-url".to_string(),
            max_batch_size: 500,
            max_vote_attempts: 5,
            retry_base_ms: 10,
        };

        let result = Dependencies::new(&settings).await;

        assert!(matches!(result, Err(AdminError::Database(_))));
    }
}
