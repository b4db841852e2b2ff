//! Error types for the votes repository.
//! Consolidates and re-exports error types related to vote and counter storage.
mod votes;

pub use votes::VotesRepositoryError;
