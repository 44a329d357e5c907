//! Loading of `genesis.toml` project configuration.
//!
//! The file is optional and every field has a default, so a project with no
//! configuration at all behaves exactly like one with an empty file. The
//! resulting [`GenesisConfig`] is passed explicitly to the parser and change
//! detector; nothing reads configuration from global state.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
