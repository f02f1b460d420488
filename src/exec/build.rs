// src/exec/build.rs

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::config::ConfigFile;
use crate::exec::backend::{BackendFuture, BuildBackend};
use crate::exec::shell_command;
use crate::types::{BuildOutcome, DEV_RUNNER_ENV};

/// Runs the configured build command through the platform shell.
///
/// Diagnostics are the command's stderr followed by its stdout, which is
/// where compilers put their errors.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command_line: String,
    working_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(command_line: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command_line: command_line.into(),
            working_dir: working_dir.into(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(cfg.build_command_line(), cfg.root())
    }

    async fn run_build(&self) -> Result<BuildOutcome> {
        info!(cmd = %self.command_line, "building");

        let mut cmd = shell_command(&self.command_line);
        cmd.current_dir(&self.working_dir)
            .env(DEV_RUNNER_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("running build command '{}'", self.command_line))?;

        let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            if !diagnostics.is_empty() && !diagnostics.ends_with('\n') {
                diagnostics.push('\n');
            }
            diagnostics.push_str(&stdout);
        }
        let diagnostics = diagnostics.trim_end().to_string();

        debug!(
            exit_code = output.status.code().unwrap_or(-1),
            success = output.status.success(),
            "build command exited"
        );

        Ok(BuildOutcome {
            success: output.status.success(),
            diagnostics,
        })
    }
}

impl BuildBackend for CommandBuilder {
    fn build(&mut self) -> BackendFuture<'_, BuildOutcome> {
        Box::pin(async move {
            match self.run_build().await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(error = %err, "build could not be run");
                    BuildOutcome::failed(format!("{err:#}"))
                }
            }
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_yields_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = CommandBuilder::new("true", dir.path());
        let outcome = builder.build().await;
        assert!(outcome.success);
        assert!(outcome.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn failing_command_captures_stderr_then_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = CommandBuilder::new(
            "echo 'src/main.rs:3: type error' >&2; echo 'aborting'; exit 2",
            dir.path(),
        );
        let outcome = builder.build().await;
        assert!(!outcome.success);
        assert_eq!(outcome.diagnostics, "src/main.rs:3: type error\naborting");
    }

    #[tokio::test]
    async fn build_runs_in_working_dir_with_marker_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = CommandBuilder::new(
            "test \"$DEV_RUNNER\" = 1 && touch built.flag",
            dir.path(),
        );
        let outcome = builder.build().await;
        assert!(outcome.success, "{}", outcome.diagnostics);
        assert!(dir.path().join("built.flag").exists());
    }

    #[tokio::test]
    async fn configured_args_reach_the_command_intact() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = crate::config::RawConfigFile::default();
        raw.build.cmd = r"printf '%s\n'".to_string();
        raw.build.args = vec!["a b".to_string(), "x;touch injected".to_string()];
        raw.run.artifact = "app".to_string();
        raw.watch.root = dir.path().to_string_lossy().into_owned();
        let cfg = ConfigFile::try_from(raw).unwrap();

        let outcome = CommandBuilder::from_config(&cfg).build().await;
        assert!(outcome.success, "{}", outcome.diagnostics);
        assert_eq!(outcome.diagnostics, "a b\nx;touch injected");
        assert!(!dir.path().join("injected").exists());
    }

    #[tokio::test]
    async fn missing_working_dir_is_a_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = CommandBuilder::new("true", dir.path().join("does-not-exist"));
        let outcome = builder.build().await;
        assert!(!outcome.success);
        assert!(outcome.diagnostics.contains("running build command"));
    }
}
