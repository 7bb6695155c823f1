//! Configuration loading
//!
//! This module provides utilities for loading application configuration
//! from environment variables and files.

pub mod loader;

pub use loader::{
    apply_session_token_override, load, load_from_env, load_from_file, probe_config_paths,
};
