mod category;
mod changeset;
mod ids;
mod migration;
mod vote_counts;
mod vote_outcome;
mod vote_record;

pub use category::{CategoryMigration, UnknownCategory, VoteCategory};
pub use changeset::{CounterAdjustment, RecordWrite, VoteChangeset};
pub use ids::{EntityId, UserId, VoteKey};
pub use migration::{CounterDrift, MigrationFailure, MigrationPhase, MigrationPreview, MigrationSummary};
pub use vote_counts::{EntityAggregate, VoteCounts};
pub use vote_outcome::{VoteAction, VoteOutcome};
pub use vote_record::VoteRecord;
