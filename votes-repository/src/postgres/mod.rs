//! PostgreSQL backend for the vote record and aggregate counter stores.
mod votes_repository;

pub use votes_repository::PostgresVotesRepository;
