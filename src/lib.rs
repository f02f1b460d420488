// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod limits;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::engine::{BuildErrorLog, LoopExit, Supervisor, SupervisorOptions};
use crate::errors::Result;
use crate::exec::{CommandBuilder, ProcessSupervisor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::ChangeEvent;
use crate::watch::{spawn_watcher, WatchFilter};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + CLI overrides)
/// - the scratch directory and open-file limit
/// - build invoker and process supervisor
/// - the supervisor loop and its file watcher
/// - Ctrl-C handling
///
/// Returns once the loop exits. A failing first build surfaces as
/// `DevloopError::InitialBuildFailed`.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config, &args.overrides())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    limits::raise_open_file_limit();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    init_folders(&cfg, fs.as_ref())?;

    let builder = CommandBuilder::from_config(&cfg);
    let processes = ProcessSupervisor::from_config(&cfg);
    let build_log = BuildErrorLog::new(cfg.build_log_path(), fs);

    let (supervisor, handle) = Supervisor::new(
        SupervisorOptions::from_config(&cfg),
        builder,
        processes,
        build_log,
    );

    let filter = WatchFilter::from_config(&cfg)?;
    let _watcher = spawn_watcher(cfg.root(), filter, handle.events())?;

    // Ctrl-C → stop the running instance and leave the loop.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            handle.shutdown();
        });
    }

    let loop_task = tokio::spawn(supervisor.run());

    // First build happens without waiting for an edit.
    handle.notify(ChangeEvent::initial()).await?;

    let exit = loop_task
        .await
        .context("supervisor loop task panicked")??;

    match exit {
        LoopExit::Shutdown => info!("shut down"),
        LoopExit::ChannelClosed => info!("watcher gone; exiting"),
    }
    Ok(())
}

/// Create the scratch directory the build-failure record lives in.
fn init_folders(cfg: &ConfigFile, fs: &dyn FileSystem) -> Result<()> {
    let tmp_dir = cfg.tmp_dir();
    fs.create_dir_all(&tmp_dir)
        .with_context(|| format!("preparing scratch directory {:?}", tmp_dir))?;
    Ok(())
}

/// Simple dry-run output: print the effective settings.
fn print_dry_run(cfg: &ConfigFile) {
    println!("devloop dry-run");
    println!("  build.cmd        = {}", cfg.build_command_line());
    println!("  build.delay_ms   = {}", cfg.build.delay_ms);
    println!("  build.error_log  = {}", cfg.build_log_path().display());
    println!("  run.artifact     = {}", cfg.artifact_path().display());
    if !cfg.run.args.is_empty() {
        println!("  run.args         = {:?}", cfg.run.args);
    }
    println!("  run.stop_timeout = {}ms", cfg.run.stop_timeout_ms);
    println!("  watch.root       = {}", cfg.root().display());
    println!("  watch.tmp_dir    = {}", cfg.tmp_dir().display());
    if cfg.watch.extensions.is_empty() {
        println!("  watch.extensions = (all files)");
    } else {
        println!("  watch.extensions = {:?}", cfg.watch.extensions);
    }
    if !cfg.watch.exclude.is_empty() {
        println!("  watch.exclude    = {:?}", cfg.watch.exclude);
    }
}
