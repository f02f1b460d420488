// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::Overrides;

/// Command-line arguments for `devloop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devloop",
    version,
    about = "Rebuild and restart a program whenever its sources change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Devloop.toml` in the current working directory. Built-in
    /// defaults are used when the default file does not exist.
    #[arg(long, value_name = "PATH", default_value = "Devloop.toml")]
    pub config: String,

    /// Build command line (overrides `[build].cmd`).
    #[arg(long, value_name = "CMD")]
    pub build_cmd: Option<String>,

    /// Extra build arguments, whitespace separated (overrides `[build].args`).
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub build_args: Option<String>,

    /// Debounce delay in milliseconds (overrides `[build].delay_ms`).
    #[arg(long, value_name = "MS")]
    pub build_delay: Option<u64>,

    /// Path of the built program to run (overrides `[run].artifact`).
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<String>,

    /// Arguments for the program, whitespace separated (overrides `[run].args`).
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub run_args: Option<String>,

    /// File extension that triggers a rebuild. Repeatable; replaces
    /// `[watch].extensions`.
    #[arg(long = "watch-ext", value_name = "EXT")]
    pub watch_ext: Vec<String>,

    /// Glob to ignore. Repeatable; added to `[watch].exclude`.
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVLOOP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the effective settings, but don't build or run.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            build_cmd: self.build_cmd.clone(),
            build_args: self.build_args.as_deref().map(split_args),
            build_delay_ms: self.build_delay,
            artifact: self.artifact.clone(),
            run_args: self.run_args.as_deref().map(split_args),
            extensions: self.watch_ext.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

fn split_args(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_overrides() {
        let args = CliArgs::try_parse_from([
            "devloop",
            "--artifact",
            "bin/server",
            "--run-args=--port 8080",
            "--build-delay",
            "250",
            "--watch-ext",
            "rs",
            "--watch-ext",
            "html",
            "--exclude",
            "vendor/**",
        ])
        .unwrap();

        let o = args.overrides();
        assert_eq!(o.artifact.as_deref(), Some("bin/server"));
        assert_eq!(
            o.run_args,
            Some(vec!["--port".to_string(), "8080".to_string()])
        );
        assert_eq!(o.build_delay_ms, Some(250));
        assert_eq!(o.extensions, vec!["rs".to_string(), "html".to_string()]);
        assert_eq!(o.exclude, vec!["vendor/**".to_string()]);
        assert!(o.build_cmd.is_none());
        assert!(o.build_args.is_none());
    }

    #[test]
    fn defaults_point_at_devloop_toml() {
        let args = CliArgs::try_parse_from(["devloop"]).unwrap();
        assert_eq!(args.config, "Devloop.toml");
        assert!(!args.dry_run);
        assert!(args.log_level.is_none());
    }
}
