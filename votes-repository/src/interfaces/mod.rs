//! This module defines and re-exports the interfaces for the votes repository.
//! It serves as a central point for accessing traits related to data interaction.
mod migration;
mod votes;

pub use migration::{MigrationRepository, MAX_WRITE_BATCH};
pub use votes::VotesRepository;
