//! # Votes Engine
//! This crate implements the vote-counter consistency engine: live vote
//! transactions that keep entity counters in step with vote records, bulk
//! category migrations executed in bounded batches, and a read-only counter
//! audit.
pub mod audit;
pub mod batching;
pub mod config;
pub mod migration;
pub mod transaction;

pub mod errors;

pub use audit::CounterAuditor;
pub use config::VoteEngineConfig;
pub use migration::MigrationService;
pub use transaction::VoteTransactionService;
