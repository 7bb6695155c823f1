//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! workspace.

// Transport defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_USER_AGENT: &str = concat!("fieldcrm/", env!("CARGO_PKG_VERSION"));
pub const JSON_MEDIA_TYPE: &str = "application/json";

// Session handling
pub const BEARER_PREFIX: &str = "Bearer ";
pub const MISSING_AUTHORIZATION: &str = "MISSING";
pub const TOKEN_REFRESH_THRESHOLD_SECS: i64 = 60;

// REST endpoints served by the CRM backend
pub const ENDPOINT_ONBOARDING: &str = "preferences/is-onboarded";
pub const ENDPOINT_TEU_TARGET_STATUS: &str = "crm_data/target_status/teu";
pub const ENDPOINT_MEETINGS_SPLIT: &str = "crm_data/meetings_split/";
pub const ENDPOINT_PRE_PLAN: &str = "calendar/pre-plan";
