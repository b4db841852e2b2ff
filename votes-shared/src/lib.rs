//! # Votes Shared
//! This crate defines the data structures shared across the vote counter engine.
//! It includes vote categories, vote records, per-entity counters, vote outcomes,
//! changesets and migration summaries.
pub mod types;
