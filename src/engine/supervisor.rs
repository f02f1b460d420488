// src/engine/supervisor.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::errors::{DevloopError, Result};
use crate::exec::{BuildBackend, ProcessBackend};
use crate::types::ChangeEvent;

use super::build_log::BuildErrorLog;
use super::core::{CoreCommand, CoreRuntime};
use super::debounce::{event_channel, Burst, Debouncer, EventSender};
use super::{LoopEvent, LoopExit, EVENT_QUEUE_CAPACITY};

#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    /// Debounce delay.
    pub build_delay: Duration,
    pub queue_capacity: usize,
}

impl SupervisorOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            build_delay: cfg.build_delay(),
            queue_capacity: EVENT_QUEUE_CAPACITY,
        }
    }
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            build_delay: Duration::from_millis(600),
            queue_capacity: EVENT_QUEUE_CAPACITY,
        }
    }
}

/// Handle to the one supervisor loop of the process.
///
/// Given to the watcher (to feed change events) and to the entry point (to
/// seed the first build and request shutdown).
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    events: EventSender,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SupervisorHandle {
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub async fn notify(&self, event: ChangeEvent) -> Result<()> {
        self.events.send(event).await
    }

    /// Ask the loop to stop the running instance and return. Honoured the
    /// next time the loop is waiting for changes.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// The supervisor loop: wait for a burst, build, then keep or replace the
/// running instance.
///
/// Builds and restarts run inline on the loop's own task, so there is never
/// more than one cycle in flight.
pub struct Supervisor<B: BuildBackend, P: ProcessBackend> {
    core: CoreRuntime,
    debouncer: Debouncer,
    builder: B,
    processes: P,
    build_log: BuildErrorLog,
    shutdown_rx: watch::Receiver<bool>,
}

impl<B: BuildBackend, P: ProcessBackend> fmt::Debug for Supervisor<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("core", &self.core)
            .field("debouncer", &self.debouncer)
            .field("build_log", &self.build_log)
            .finish_non_exhaustive()
    }
}

enum Wake {
    Burst(Burst),
    Closed,
    Shutdown,
}

impl<B: BuildBackend, P: ProcessBackend> Supervisor<B, P> {
    pub fn new(
        options: SupervisorOptions,
        builder: B,
        processes: P,
        build_log: BuildErrorLog,
    ) -> (Self, SupervisorHandle) {
        let (events, rx) = event_channel(options.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = Self {
            core: CoreRuntime::new(),
            debouncer: Debouncer::new(rx, options.build_delay),
            builder,
            processes,
            build_log,
            shutdown_rx,
        };
        let handle = SupervisorHandle {
            events,
            shutdown: Arc::new(shutdown_tx),
        };

        (supervisor, handle)
    }

    /// Run until shutdown, until every event sender is gone, or until the
    /// first build fails (`DevloopError::InitialBuildFailed`).
    pub async fn run(mut self) -> Result<LoopExit> {
        info!(
            delay_ms = self.debouncer.delay().as_millis() as u64,
            "supervisor loop started"
        );

        loop {
            let iteration = self.core.begin_iteration();
            info!(iteration, "waiting for changes");

            let wake = tokio::select! {
                biased;
                () = shutdown_requested(&mut self.shutdown_rx) => Wake::Shutdown,
                burst = self.debouncer.next_burst() => match burst {
                    Some(burst) => Wake::Burst(burst),
                    None => Wake::Closed,
                },
            };

            let burst = match wake {
                Wake::Burst(burst) => burst,
                Wake::Shutdown => {
                    info!("shutdown requested");
                    return self.finish(LoopExit::Shutdown).await;
                }
                Wake::Closed => {
                    info!("change event channel closed");
                    return self.finish(LoopExit::ChannelClosed).await;
                }
            };

            self.run_cycle(iteration, burst).await?;
            info!(iteration, "cycle complete");
        }
    }

    /// Build once and act on the outcome. A fatal first-build failure comes
    /// back as `Err`.
    async fn run_cycle(&mut self, iteration: u64, burst: Burst) -> Result<()> {
        info!(
            iteration,
            first = %burst.first,
            coalesced = burst.coalesced,
            "changes settled; building"
        );

        self.build_log.clear();

        let started_at = Instant::now();
        let outcome = self.builder.build().await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        if outcome.success {
            info!(iteration, elapsed_ms, "build succeeded");
        } else {
            warn!(
                iteration,
                elapsed_ms,
                "build failed:\n{}",
                outcome.diagnostics
            );
        }

        let step = self.core.step(LoopEvent::BuildFinished(outcome));
        self.execute_commands(step.commands).await
    }

    async fn execute_commands(&mut self, commands: Vec<CoreCommand>) -> Result<()> {
        for command in commands {
            debug!(?command, "executing core command");
            match command {
                CoreCommand::RecordFailure(diagnostics) => {
                    self.build_log.record(&diagnostics);
                    info!(path = ?self.build_log.path(), "previous instance left running");
                }
                CoreCommand::StopInstance => {
                    if let Err(e) = self.processes.stop().await {
                        error!(
                            error = %e,
                            "could not stop running instance; not starting the new build"
                        );
                        return Ok(());
                    }
                }
                CoreCommand::StartInstance => {
                    self.processes.run();
                }
                CoreCommand::Abort(diagnostics) => {
                    error!("initial build failed; nothing to fall back to");
                    return Err(DevloopError::InitialBuildFailed(diagnostics));
                }
            }
        }
        Ok(())
    }

    async fn finish(mut self, exit: LoopExit) -> Result<LoopExit> {
        let step = self.core.step(LoopEvent::ShutdownRequested);
        self.execute_commands(step.commands).await?;
        info!(?exit, "supervisor loop exiting");
        Ok(exit)
    }
}

/// Resolves once shutdown has been requested. Never resolves if the handle
/// is dropped without asking.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        let requested = *rx.borrow_and_update();
        if requested {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
