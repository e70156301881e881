//! # rulecast-hook
//!
//! Hook binary: reads a request from stdin, writes the response to stdout.
//! Any failure still produces `{"continue": true, ...}` and exit code 0.

#![deny(unsafe_code)]

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rulecast_core::logging::init_subscriber;
use rulecast_hook::{HookOutcome, HookRequest, HookResponse, RuleHook};
use rulecast_settings::RulecastSettings;
use tracing::warn;

/// Injects relevant engineering rules into a prompt.
#[derive(Parser, Debug)]
#[command(name = "rulecast-hook", about = "Inject relevant engineering rules into a prompt")]
struct Cli {
    /// Settings file (defaults to `~/.rulecast/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level (overrides settings; `RUST_LOG` wins over both).
    #[arg(long)]
    log_level: Option<String>,

    /// Pretty-print selection diagnostics to stderr.
    #[arg(long)]
    explain: bool,
}

fn load_settings(path: Option<&PathBuf>) -> (RulecastSettings, Option<String>) {
    let loaded = match path {
        Some(path) => rulecast_settings::load_settings_from_path(path),
        None => rulecast_settings::load_settings(),
    };
    match loaded {
        Ok(settings) => (settings, None),
        Err(e) => {
            let mut settings = RulecastSettings::default();
            rulecast_settings::apply_env_overrides(&mut settings);
            (settings, Some(e.to_string()))
        }
    }
}

fn read_request() -> Result<HookRequest> {
    let mut input = String::new();
    let _ = std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    if input.trim().is_empty() {
        return Ok(HookRequest::default());
    }
    serde_json::from_str(&input).context("Failed to parse hook request")
}

fn write_response(response: &HookResponse) -> Result<()> {
    let json = serde_json::to_string(response).context("Failed to serialize response")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("Failed to write response")?;
    stdout.flush().context("Failed to flush stdout")
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let (settings, settings_error) = load_settings(args.settings.as_ref());
    init_subscriber(args.log_level.as_deref().unwrap_or(&settings.logging.level));
    if let Some(error) = &settings_error {
        warn!(error = %error, "settings unreadable, using defaults");
    }

    let outcome = match read_request() {
        Ok(request) => RuleHook::from_settings(settings).handle(&request).await,
        Err(e) => {
            warn!(error = %e, "bad hook request (fail-open)");
            HookOutcome::degraded(format!("{e:#}"))
        }
    };

    if args.explain {
        match serde_json::to_string_pretty(outcome.metadata()) {
            Ok(pretty) => eprintln!("{pretty}"),
            Err(e) => warn!(error = %e, "failed to render diagnostics"),
        }
    }

    if let Err(e) = write_response(&outcome.into_response()) {
        warn!(error = %e, "failed to write hook response");
    }
}
