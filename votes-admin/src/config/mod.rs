//! Configuration module for the votes admin tool.
//! Reads settings from the environment and wires the engine services.
mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{LogFormat, Settings};
