//! This module defines the `VoteTransactionService`, which casts a single user's
//! vote on an entity and keeps the entity counters consistent with the vote
//! records.
//!
//! Every call is an optimistic read-modify-write: the current aggregate and
//! vote record are read, the transition is planned in memory, and the result
//! is committed conditionally on nothing having changed in between. Lost
//! races are retried with exponential backoff.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, instrument, warn};
use votes_repository::VotesRepository;
use votes_shared::types::{
    EntityId, RecordWrite, VoteAction, VoteCategory, VoteChangeset, VoteCounts, VoteKey,
    VoteOutcome, VoteRecord,
};
use crate::config::VoteEngineConfig;
use crate::errors::{ConfigError, VoteError};

/// The writes a vote call will commit, computed from the state it read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTransition {
    pub action: VoteAction,
    pub record: RecordWrite,
    pub counts: VoteCounts,
}

/// Computes the transition of a user's vote record when `category` is cast.
///
/// | stored vote | cast | result |
/// |---|---|---|
/// | none | C | insert, `counts[C] + 1`, `Added` |
/// | C | C | delete, `counts[C] - 1`, `Removed` |
/// | C | D | overwrite, `counts[C] - 1`, `counts[D] + 1`, `Changed` |
///
/// Decrements stop at zero.
///
/// # Arguments
///
/// * `stored` - The caller's current vote record, if any
/// * `key` - The record key of the caller
/// * `category` - The category being cast
/// * `counts` - The entity counters that were read
/// * `now` - Creation time for a new record, in unix seconds
pub fn plan_transition(
    stored: Option<&VoteRecord>,
    key: &VoteKey,
    category: VoteCategory,
    mut counts: VoteCounts,
    now: i64,
) -> VoteTransition {
    let (action, record) = match stored {
        None => {
            counts.increment(category);
            (
                VoteAction::Added,
                RecordWrite::Insert(VoteRecord {
                    entity_id: key.entity_id,
                    user_id: key.user_id.clone(),
                    category,
                    created_at: now,
                }),
            )
        }
        Some(previous) if previous.category == category => {
            counts.decrement(category);
            (
                VoteAction::Removed,
                RecordWrite::Delete {
                    key: key.clone(),
                    expected: category,
                },
            )
        }
        Some(previous) => {
            counts.decrement(previous.category);
            counts.increment(category);
            (
                VoteAction::Changed,
                RecordWrite::Update {
                    key: key.clone(),
                    expected: previous.category,
                    category,
                },
            )
        }
    };

    VoteTransition {
        action,
        record,
        counts,
    }
}

/// `VoteTransactionService` records votes and serves the counters of entities.
pub struct VoteTransactionService {
    repository: Arc<dyn VotesRepository>,
    config: VoteEngineConfig,
}

impl VoteTransactionService {
    /// Creates a new `VoteTransactionService`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration is unusable.
    pub fn new(
        repository: Arc<dyn VotesRepository>,
        config: VoteEngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { repository, config })
    }

    /// Casts `category` as `user_id`'s vote on `entity_id`.
    ///
    /// Casting the category the user already voted for withdraws the vote;
    /// casting another one replaces it.
    ///
    /// # Returns
    ///
    /// * `Ok(VoteOutcome)` - The committed action and the resulting counters
    /// * `Err(VoteError)` - Nothing was written
    #[instrument(skip(self))]
    pub async fn vote(
        &self,
        entity_id: EntityId,
        user_id: &str,
        category: VoteCategory,
    ) -> Result<VoteOutcome, VoteError> {
        if !category.is_current() {
            return Err(VoteError::InvalidCategory(format!(
                "{category} is deprecated and cannot be cast"
            )));
        }
        if !self.repository.user_exists(user_id).await? {
            return Err(VoteError::not_found(format!("user {user_id}")));
        }

        let key = VoteKey::new(entity_id, user_id);
        let attempts = AtomicUsize::new(0);
        let retry = ExponentialBackoff::from_millis(2)
            .factor(self.config.retry_base_ms)
            .max_delay(self.config.max_retry_delay())
            .map(jitter)
            .take(self.config.max_vote_attempts.saturating_sub(1));

        let result = RetryIf::spawn(
            retry,
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.try_vote(&key, category)
            },
            |err: &VoteError| {
                let conflicted = err.is_conflict();
                if conflicted {
                    debug!(error = %err, "Vote lost a concurrent write, retrying");
                }
                conflicted
            },
        )
        .await;

        match result {
            Ok(outcome) => {
                info!(
                    action = ?outcome.action,
                    attempts = attempts.load(Ordering::Relaxed),
                    "Vote committed"
                );
                Ok(outcome)
            }
            Err(err) if err.is_conflict() => {
                let attempts = attempts.load(Ordering::Relaxed);
                warn!(attempts, "Vote gave up after repeated conflicts");
                Err(VoteError::TransactionConflict { attempts })
            }
            Err(err) => Err(err),
        }
    }

    /// One optimistic attempt: read, plan, commit conditionally.
    async fn try_vote(&self, key: &VoteKey, category: VoteCategory) -> Result<VoteOutcome, VoteError> {
        let (aggregate, stored) = tokio::try_join!(
            self.repository.get_aggregate(key.entity_id),
            self.repository.get_vote(key)
        )?;
        let aggregate = aggregate
            .ok_or_else(|| VoteError::not_found(format!("entity {}", key.entity_id)))?;

        let now = chrono::Utc::now().timestamp();
        let transition = plan_transition(stored.as_ref(), key, category, aggregate.counts, now);

        let changeset = VoteChangeset {
            entity_id: key.entity_id,
            expected_version: aggregate.version,
            record: transition.record,
            counts: transition.counts,
        };
        self.repository.commit_vote(&changeset).await?;

        Ok(VoteOutcome {
            action: transition.action,
            counts: transition.counts,
        })
    }

    /// Reads the stored counters of an entity.
    pub async fn counts(&self, entity_id: EntityId) -> Result<VoteCounts, VoteError> {
        self.repository
            .get_aggregate(entity_id)
            .await?
            .map(|aggregate| aggregate.counts)
            .ok_or_else(|| VoteError::not_found(format!("entity {entity_id}")))
    }

    /// Reads the current vote of a user on an entity, if any.
    pub async fn user_vote(
        &self,
        entity_id: EntityId,
        user_id: &str,
    ) -> Result<Option<VoteRecord>, VoteError> {
        Ok(self
            .repository
            .get_vote(&VoteKey::new(entity_id, user_id))
            .await?)
    }
}
