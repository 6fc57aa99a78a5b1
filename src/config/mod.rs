//! Configuration management for recwave.
//!
//! Loads the TOML configuration file and resolves the fixed
//! location of the recording artifact.

pub mod file;

pub use file::{get_config_path, recording_path, RecwaveConfig};
