// src/logging.rs

//! Logging setup for `devloop` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `DEVLOOP_LOG` environment variable: a level ("info", "warning") or
//!    full directives ("debug,devloop::watch=trace,app=off")
//! 3. default to `info`
//!
//! Logs go to STDERR, next to the supervised program's own output.

use anyhow::{anyhow, Result};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable read when `--log-level` is absent.
pub const LOG_ENV: &str = "DEVLOOP_LOG";

/// Target for lines forwarded from the running instance's stdout/stderr.
///
/// Kept at `info` even when devloop itself is turned down to `warn` or
/// `error`: the program's output is the point of running it. Mention `app`
/// in `DEVLOOP_LOG` (e.g. `app=off`) to take control of it.
pub const APP_TARGET: &str = "app";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialising logging: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    let spec = match (cli_level, env.map(str::trim)) {
        (Some(lvl), _) => level_name(lvl).to_string(),
        (None, Some(s)) if !s.is_empty() => match parse_level_str(s) {
            Some(lvl) => lvl.to_string().to_lowercase(),
            None => s.to_string(),
        },
        _ => "info".to_string(),
    };

    let filter = match EnvFilter::try_new(&spec) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("devloop: ignoring invalid {LOG_ENV} value {spec:?}: {e}");
            EnvFilter::new("info")
        }
    };

    if names_app_target(&spec) {
        return filter;
    }
    match format!("{APP_TARGET}=info").parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Whether the user already said something about the `app` target.
fn names_app_target(spec: &str) -> bool {
    spec.split(',').any(|directive| {
        let target = directive.split(['=', '[']).next().unwrap_or("").trim();
        target == APP_TARGET
    })
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
