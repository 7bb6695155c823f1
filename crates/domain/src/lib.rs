//! # FieldCRM Domain
//!
//! Business domain types and models for the FieldCRM API client.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Response payloads served by the CRM REST API
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other FieldCRM crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
