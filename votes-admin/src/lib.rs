//! Votes Admin Library
//!
//! Operator tooling for the vote-counter consistency engine: configuration,
//! dependency wiring, command line parsing and command execution.

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;

pub use cli::{Cli, Command};
pub use config::{Dependencies, LogFormat, Settings};
pub use errors::AdminError;
