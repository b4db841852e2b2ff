mod config;
mod migration;
mod vote;

pub use config::ConfigError;
pub use migration::MigrationError;
pub use vote::VoteError;
