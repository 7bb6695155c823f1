//! FieldCRM - command-line client for the CRM REST API
//!
//! Main entry point.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use fieldcrm_app::{execute, load_config, logging, AppContext, AppError, Cli};
use serde_json::Value;

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => return report(&err),
    };

    logging::init(&config.logging);
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    let ctx = match AppContext::new(config) {
        Ok(ctx) => ctx,
        Err(err) => return report(&err),
    };

    let result = execute(&ctx, cli.command).await;
    ctx.shutdown();

    match result.map(|value| print_json(&value)) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            tracing::error!(error = %err, "Failed to write output");
            ExitCode::from(4)
        }
        Err(err) => report(&err),
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serialize response")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").context("write to stdout")?;
    Ok(())
}

fn report(err: &AppError) -> ExitCode {
    tracing::error!(error = %err, "fieldcrm command failed");
    let _ = writeln!(io::stderr(), "error: {err}");
    ExitCode::from(err.exit_code())
}
