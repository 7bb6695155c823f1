//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `FIELDCRM_API_URL` is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. After a file load, `FIELDCRM_SESSION_TOKEN` still overrides the
//!    file's session token
//!
//! ## Environment Variables
//! - `FIELDCRM_API_URL`: Base URL of the CRM REST API (required)
//! - `FIELDCRM_API_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `FIELDCRM_USER_AGENT`: User agent sent with every request
//! - `FIELDCRM_SESSION_TOKEN`: Pre-issued bearer token
//! - `FIELDCRM_MASK_TOKENS`: Mask tokens in failure logs (true/false)
//! - `FIELDCRM_LOG_JWT_CLAIMS`: Log decoded token claims (true/false)
//! - `FIELDCRM_LOG_FILTER`: Default tracing filter directive
//! - `FIELDCRM_LOG_JSON`: Emit JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./fieldcrm.json` or `./fieldcrm.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use fieldcrm_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use fieldcrm_domain::{
    ApiConfig, Config, DiagnosticsConfig, FieldCrmError, LoggingConfig, Result, SessionConfig,
};

pub const ENV_API_URL: &str = "FIELDCRM_API_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "FIELDCRM_API_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "FIELDCRM_USER_AGENT";
pub const ENV_SESSION_TOKEN: &str = "FIELDCRM_SESSION_TOKEN";
pub const ENV_MASK_TOKENS: &str = "FIELDCRM_MASK_TOKENS";
pub const ENV_LOG_JWT_CLAIMS: &str = "FIELDCRM_LOG_JWT_CLAIMS";
pub const ENV_LOG_FILTER: &str = "FIELDCRM_LOG_FILTER";
pub const ENV_LOG_JSON: &str = "FIELDCRM_LOG_JSON";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the API URL is
/// missing, falls back to loading from a config file. The result is
/// validated before it is returned.
///
/// # Errors
/// Returns `FieldCrmError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            let mut config = load_from_file(None)?;
            apply_session_token_override(&mut config);
            config
        }
    };

    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Configuration is invalid");
        return Err(e);
    }
    Ok(config)
}

/// Load configuration from environment variables
///
/// `FIELDCRM_API_URL` must be present; every other variable is optional.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `FieldCrmError::Config` if the API URL is missing or a numeric
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let base_url = env_var(ENV_API_URL)?;
    let timeout_secs = match optional_env_var(ENV_API_TIMEOUT_SECS) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
            FieldCrmError::Config(format!("Invalid {ENV_API_TIMEOUT_SECS} '{raw}': {e}"))
        })?,
        None => DEFAULT_REQUEST_TIMEOUT_SECS,
    };

    let logging_defaults = LoggingConfig::default();

    Ok(Config {
        api: ApiConfig { base_url, timeout_secs, user_agent: optional_env_var(ENV_USER_AGENT) },
        session: SessionConfig { token: optional_env_var(ENV_SESSION_TOKEN) },
        diagnostics: DiagnosticsConfig {
            mask_tokens: env_bool(ENV_MASK_TOKENS, false),
            log_jwt_claims: env_bool(ENV_LOG_JWT_CLAIMS, false),
        },
        logging: LoggingConfig {
            filter: optional_env_var(ENV_LOG_FILTER).unwrap_or(logging_defaults.filter),
            json: env_bool(ENV_LOG_JSON, logging_defaults.json),
        },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `FieldCrmError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FieldCrmError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FieldCrmError::Config(format!(
                "{ENV_API_URL} is not set and no config file was found in any of the standard \
                 locations"
            ))
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FieldCrmError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `FieldCrmError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FieldCrmError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FieldCrmError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(FieldCrmError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./fieldcrm.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.is_file())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("fieldcrm.json"),
        dir.join("fieldcrm.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Apply `FIELDCRM_SESSION_TOKEN` on top of a file-based configuration.
pub fn apply_session_token_override(config: &mut Config) {
    if let Some(token) = optional_env_var(ENV_SESSION_TOKEN) {
        tracing::debug!("Session token taken from environment");
        config.session.token = Some(token);
    }
}

/// Get required environment variable
///
/// # Errors
/// Returns `FieldCrmError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    optional_env_var(key).ok_or_else(|| {
        FieldCrmError::Config(format!("Missing required environment variable: {}", key))
    })
}

fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
