//! # FieldCRM command-line front end
//!
//! Wires configuration, logging, the transport, a session provider and the
//! token attacher into an [`AppContext`], then runs one CLI command.

pub mod cli;
pub mod context;
pub mod errors;
pub mod logging;

pub use cli::{execute, load_config, run, Cli, Command};
pub use context::AppContext;
pub use errors::AppError;
