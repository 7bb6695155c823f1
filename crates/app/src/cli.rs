//! Command-line interface
//!
//! Every subcommand resolves to one facade call (or a typed endpoint) and
//! yields a JSON value for the caller to print.

use std::path::PathBuf;

use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use fieldcrm_domain::Config;
use fieldcrm_infra::api::{decode_jwt_claims, mask_token, token_expiry};
use fieldcrm_infra::{config, QueryParams};
use serde_json::{json, Value};
use tracing::debug;

use crate::context::AppContext;
use crate::errors::AppError;

#[derive(Debug, Parser)]
#[command(name = "fieldcrm")]
#[command(version, about = "Authenticated client for the FieldCRM REST API", long_about = None)]
pub struct Cli {
    /// JSON or TOML config file; skips environment and path probing
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// GET an API path
    Get {
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short = 'q', long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
    /// POST to an API path
    Post {
        path: String,
        /// JSON request body
        #[arg(long, value_parser = parse_json)]
        body: Option<Value>,
    },
    /// PUT to an API path
    Put {
        path: String,
        /// JSON request body
        #[arg(long, value_parser = parse_json)]
        body: Option<Value>,
    },
    /// DELETE an API path
    Delete { path: String },
    /// Show onboarding status and user profile
    Onboarding,
    /// Show TEU targets and achievement
    Targets,
    /// Show meeting counts split by period
    Meetings,
    /// Show planned visits for a month
    PrePlan {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
    /// Decode the configured session token without contacting the API
    Claims,
}

/// Resolve configuration for this invocation.
///
/// # Errors
/// Returns error if no usable configuration can be found
pub fn load_config(cli: &Cli) -> Result<Config, AppError> {
    match &cli.config {
        Some(path) => {
            let mut config = config::load_from_file(Some(path.clone()))?;
            config::apply_session_token_override(&mut config);
            Ok(config)
        }
        None => Ok(config::load()?),
    }
}

/// Run one command against a prepared context.
///
/// # Errors
/// Returns the API failure, or an argument error for malformed input
pub async fn execute(ctx: &AppContext, command: Command) -> Result<Value, AppError> {
    debug!(?command, "executing command");

    let value = match command {
        Command::Get { path, query } => {
            let params: QueryParams = query.into_iter().collect();
            ctx.client.get(&path, Some(params)).await?
        }
        Command::Post { path, body } => ctx.client.post(&path, body).await?,
        Command::Put { path, body } => ctx.client.put(&path, body).await?,
        Command::Delete { path } => ctx.client.delete(&path).await?,
        Command::Onboarding => serde_json::to_value(ctx.commands.onboarding_status().await?)?,
        Command::Targets => serde_json::to_value(ctx.commands.teu_target_status().await?)?,
        Command::Meetings => serde_json::to_value(ctx.commands.meetings_split().await?)?,
        Command::PrePlan { year, month } => {
            serde_json::to_value(ctx.commands.pre_plan(year, month).await?)?
        }
        Command::Claims => token_report(ctx.config.session.token.as_deref())?,
    };
    Ok(value)
}

/// Build the context, run `command`, then eject the attacher.
///
/// # Errors
/// Same as [`AppContext::new`] and [`execute`]
pub async fn run(config: Config, command: Command) -> Result<Value, AppError> {
    let ctx = AppContext::new(config)?;
    let result = execute(&ctx, command).await;
    ctx.shutdown();
    result
}

fn token_report(token: Option<&str>) -> Result<Value, AppError> {
    let token = token.ok_or_else(|| {
        AppError::InvalidArgument("no session token configured (set FIELDCRM_SESSION_TOKEN)".into())
    })?;
    let claims = decode_jwt_claims(token)
        .ok_or_else(|| AppError::InvalidArgument("session token is not a decodable JWT".into()))?;
    let expires_at = token_expiry(token).map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));

    Ok(json!({
        "token": mask_token(Some(token)),
        "claims": claims,
        "expires_at": expires_at,
    }))
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))
}
