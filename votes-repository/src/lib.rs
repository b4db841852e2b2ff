//! # Votes Repository
//! This crate provides the traits and implementations for the vote record store
//! and the aggregate counter store. It includes definitions for errors, the
//! repository interfaces, a PostgreSQL backend and an in-memory backend.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use errors::VotesRepositoryError;
pub use interfaces::{MigrationRepository, VotesRepository, MAX_WRITE_BATCH};
pub use memory::InMemoryVotesRepository;
pub use postgres::PostgresVotesRepository;
