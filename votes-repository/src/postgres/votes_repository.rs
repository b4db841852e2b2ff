//! PostgreSQL implementation of the votes repository.
//!
//! Provides the `VotesRepository` and `MigrationRepository` traits on top of a
//! `sqlx::PgPool`.
//!
//! ## Key Features
//!
//! - ACID transactions with automatic rollback on drop
//! - Optimistic concurrency on entity counters through a `version` column
//! - Conditional record writes guarded by the category that was read
//! - Bulk relabeling using PostgreSQL's `UNNEST`
//!
//! ## Database Tables
//!
//! - `users`: Known voters
//! - `entities`: Per-entity vote counters and their version
//! - `vote_records`: One vote per (entity, user)
use async_trait::async_trait;
use sqlx::Row;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;
use votes_shared::types::{
    CategoryMigration, CounterAdjustment, EntityAggregate, EntityId, RecordWrite, VoteCategory,
    VoteChangeset, VoteCounts, VoteKey, VoteRecord,
};
use crate::{MigrationRepository, VotesRepository, VotesRepositoryError};

/// PostgreSQL implementation of the votes repository.
pub struct PostgresVotesRepository {
    pool: sqlx::PgPool,
    max_write_batch: usize,
}

impl PostgresVotesRepository {
    /// Creates a new PostgreSQL repository instance.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresVotesRepository)` - Ready-to-use repository instance
    /// * `Err(VotesRepositoryError)` - Future validation errors (currently always succeeds)
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, VotesRepositoryError> {
        Ok(Self {
            pool,
            max_write_batch: crate::MAX_WRITE_BATCH,
        })
    }

    /// Applies the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), VotesRepositoryError> {
        sqlx::migrate!("src/postgres/migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Checks if the tables are created in the database.
    pub async fn check_tables_created(&self) -> Result<bool, VotesRepositoryError> {
        for table in ["users", "entities", "vote_records"] {
            let table_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
            if !table_exists {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_batch_size(&self, size: usize) -> Result<(), VotesRepositoryError> {
        if size > self.max_write_batch {
            return Err(VotesRepositoryError::BatchTooLarge {
                provided: size,
                max: self.max_write_batch,
            });
        }
        Ok(())
    }

    /// Applies the record half of a vote changeset within an active transaction.
    async fn write_record_tx(
        &self,
        record: &RecordWrite,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), VotesRepositoryError> {
        let result = match record {
            RecordWrite::Insert(vote) => {
                let created_at = OffsetDateTime::from_unix_timestamp(vote.created_at)
                    .map_err(|_| VotesRepositoryError::InvalidTimestamp(vote.created_at))?;
                sqlx::query(
                    r#"
                    INSERT INTO vote_records (entity_id, user_id, category, created_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (entity_id, user_id) DO NOTHING
                    "#,
                )
                .bind(vote.entity_id)
                .bind(&vote.user_id)
                .bind(vote.category.as_str())
                .bind(created_at)
                .execute(&mut **tx)
                .await?
            }
            RecordWrite::Update {
                key,
                expected,
                category,
            } => {
                sqlx::query(
                    r#"
                    UPDATE vote_records SET category = $3
                    WHERE entity_id = $1 AND user_id = $2 AND category = $4
                    "#,
                )
                .bind(key.entity_id)
                .bind(&key.user_id)
                .bind(category.as_str())
                .bind(expected.as_str())
                .execute(&mut **tx)
                .await?
            }
            RecordWrite::Delete { key, expected } => {
                sqlx::query(
                    "DELETE FROM vote_records WHERE entity_id = $1 AND user_id = $2 AND category = $3",
                )
                .bind(key.entity_id)
                .bind(&key.user_id)
                .bind(expected.as_str())
                .execute(&mut **tx)
                .await?
            }
        };

        if result.rows_affected() != 1 {
            let key = record.key();
            return Err(VotesRepositoryError::conflict(format!(
                "vote record ({}, {}) changed concurrently",
                key.entity_id, key.user_id
            )));
        }
        Ok(())
    }
}

fn counter_column(category: VoteCategory) -> &'static str {
    match category {
        VoteCategory::Support => "support_count",
        VoteCategory::Oppose => "oppose_count",
        VoteCategory::Opposition => "opposition_count",
    }
}

fn aggregate_from_row(row: &sqlx::postgres::PgRow) -> Result<EntityAggregate, VotesRepositoryError> {
    Ok(EntityAggregate {
        entity_id: row.try_get("id")?,
        counts: VoteCounts {
            support: row.try_get("support_count")?,
            oppose: row.try_get("oppose_count")?,
            opposition: row.try_get("opposition_count")?,
        },
        version: row.try_get("version")?,
    })
}

fn vote_from_row(row: &sqlx::postgres::PgRow) -> Result<VoteRecord, VotesRepositoryError> {
    let category: String = row.try_get("category")?;
    let created_at: OffsetDateTime = row.try_get("created_at")?;
    Ok(VoteRecord {
        entity_id: row.try_get("entity_id")?,
        user_id: row.try_get("user_id")?,
        category: category.parse()?,
        created_at: created_at.unix_timestamp(),
    })
}

#[async_trait]
impl VotesRepository for PostgresVotesRepository {
    async fn user_exists(&self, user_id: &str) -> Result<bool, VotesRepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn get_aggregate(
        &self,
        entity_id: EntityId,
    ) -> Result<Option<EntityAggregate>, VotesRepositoryError> {
        let row = sqlx::query(
            "SELECT id, support_count, oppose_count, opposition_count, version FROM entities WHERE id = $1",
        )
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(aggregate_from_row).transpose()
    }

    async fn get_vote(&self, key: &VoteKey) -> Result<Option<VoteRecord>, VotesRepositoryError> {
        let row = sqlx::query(
            "SELECT entity_id, user_id, category, created_at FROM vote_records WHERE entity_id = $1 AND user_id = $2",
        )
        .bind(key.entity_id)
        .bind(&key.user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(vote_from_row).transpose()
    }

    /// Commits the counter update and the record write in one transaction.
    ///
    /// The counter update is guarded by `version`, the record write by the
    /// expected category. If either guard matches no row the transaction is
    /// dropped, which rolls it back.
    async fn commit_vote(&self, changeset: &VoteChangeset) -> Result<(), VotesRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE entities
            SET support_count = $2, oppose_count = $3, opposition_count = $4, version = version + 1
            WHERE id = $1 AND version = $5
            "#,
        )
        .bind(changeset.entity_id)
        .bind(changeset.counts.support)
        .bind(changeset.counts.oppose)
        .bind(changeset.counts.opposition)
        .bind(changeset.expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(VotesRepositoryError::conflict(format!(
                "entity {} is no longer at version {}",
                changeset.entity_id, changeset.expected_version
            )));
        }

        self.write_record_tx(&changeset.record, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn count_votes(&self, entity_id: EntityId) -> Result<VoteCounts, VotesRepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM vote_records WHERE entity_id = $1 GROUP BY category",
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = VoteCounts::default();
        for (label, count) in rows {
            let category: VoteCategory = label.parse()?;
            counts.set(category, count);
        }
        Ok(counts)
    }

    async fn list_entity_ids(&self) -> Result<Vec<EntityId>, VotesRepositoryError> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM entities ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl MigrationRepository for PostgresVotesRepository {
    fn max_write_batch(&self) -> usize {
        self.max_write_batch
    }

    async fn find_votes_by_category(
        &self,
        category: VoteCategory,
    ) -> Result<Vec<VoteRecord>, VotesRepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT entity_id, user_id, category, created_at
            FROM vote_records
            WHERE category = $1
            ORDER BY entity_id, user_id
            "#,
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    /// Relabels a batch with a single `UPDATE ... FROM UNNEST` statement.
    async fn relabel_votes(
        &self,
        keys: &[VoteKey],
        migration: CategoryMigration,
    ) -> Result<Vec<VoteKey>, VotesRepositoryError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.check_batch_size(keys.len())?;

        let entity_ids: Vec<Uuid> = keys.iter().map(|k| k.entity_id).collect();
        let user_ids: Vec<String> = keys.iter().map(|k| k.user_id.clone()).collect();

        let mut tx = self.pool.begin().await?;
        let relabeled: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            UPDATE vote_records AS v SET category = $3
            FROM UNNEST($1::uuid[], $2::text[]) AS k(entity_id, user_id)
            WHERE v.entity_id = k.entity_id AND v.user_id = k.user_id AND v.category = $4
            RETURNING v.entity_id, v.user_id
            "#,
        )
        .bind(&entity_ids)
        .bind(&user_ids)
        .bind(migration.to.as_str())
        .bind(migration.from.as_str())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(requested = keys.len(), relabeled = relabeled.len(), "Relabel batch committed");

        Ok(relabeled
            .into_iter()
            .map(|(entity_id, user_id)| VoteKey { entity_id, user_id })
            .collect())
    }

    async fn get_aggregates(
        &self,
        entity_ids: &[EntityId],
    ) -> Result<Vec<EntityAggregate>, VotesRepositoryError> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, support_count, oppose_count, opposition_count, version
            FROM entities
            WHERE id = ANY($1::uuid[])
            "#,
        )
        .bind(entity_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(aggregate_from_row).collect()
    }

    async fn adjust_counters(
        &self,
        adjustments: &[CounterAdjustment],
    ) -> Result<(), VotesRepositoryError> {
        if adjustments.is_empty() {
            return Ok(());
        }
        self.check_batch_size(adjustments.len())?;

        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for adjustment in adjustments {
            let from = counter_column(adjustment.from);
            let to = counter_column(adjustment.to);
            let statement = format!(
                "UPDATE entities SET {from} = GREATEST(0, {from} - $2), {to} = {to} + $2, version = version + 1 WHERE id = $1"
            );
            let result = sqlx::query(&statement)
                .bind(adjustment.entity_id)
                .bind(adjustment.amount)
                .execute(&mut *tx)
                .await?;
            updated += result.rows_affected() as usize;
        }

        if updated != adjustments.len() {
            return Err(VotesRepositoryError::MissingEntities {
                expected: adjustments.len(),
                updated,
            });
        }

        tx.commit().await?;
        Ok(())
    }
}
