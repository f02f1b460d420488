// src/exec/process.rs

//! Lifecycle of the running artifact.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::errors::DevloopError;
use crate::exec::backend::{BackendFuture, ProcessBackend};
use crate::logging::APP_TARGET;
use crate::types::DEV_RUNNER_ENV;

/// Sent to an instance's supervising task to ask it to stop. The task
/// replies once the child has exited and been reaped.
type StopAck = oneshot::Sender<Result<()>>;

/// Handle for the currently running instance.
///
/// - `stop_tx` asks the supervising task to terminate the child.
/// - `handle` is the Tokio task that owns the child and waits on it.
struct RunningInstance {
    number: u64,
    pid: Option<u32>,
    stop_tx: oneshot::Sender<StopAck>,
    handle: JoinHandle<()>,
}

/// Starts the built artifact and stops it again, never keeping more than
/// one instance alive.
///
/// Each instance runs under its own Tokio task which forwards nothing but
/// its exit status; stdout/stderr lines go to the log under the `app`
/// target. Dropping the supervisor kills the instance.
pub struct ProcessSupervisor {
    artifact: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
    stop_timeout: Duration,
    launched: u64,
    current: Option<RunningInstance>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("artifact", &self.artifact)
            .field("args", &self.args)
            .field("launched", &self.launched)
            .field("current_pid", &self.current.as_ref().and_then(|i| i.pid))
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new(
        artifact: impl Into<PathBuf>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            args,
            working_dir: working_dir.into(),
            stop_timeout,
            launched: 0,
            current: None,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            cfg.artifact_path(),
            cfg.run.args.clone(),
            cfg.root(),
            cfg.stop_timeout(),
        )
    }

    /// Whether an instance is alive right now.
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|instance| !instance.handle.is_finished())
    }

    /// Process id of the current instance, if one was started.
    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().and_then(|instance| instance.pid)
    }

    fn spawn_instance(&mut self) -> Result<RunningInstance> {
        // Resolve before `current_dir` applies, so a relative artifact path
        // means relative to where devloop runs.
        let program = std::path::absolute(&self.artifact).unwrap_or_else(|_| self.artifact.clone());
        let number = self.launched + 1;

        info!(instance = number, program = ?program, args = ?self.args, "starting instance");

        let mut cmd = Command::new(&program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .env(DEV_RUNNER_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {:?}", program))?;
        self.launched = number;

        let pid = child.id();
        forward_output(child.stdout.take(), number, "stdout");
        forward_output(child.stderr.take(), number, "stderr");

        let (stop_tx, stop_rx) = oneshot::channel::<StopAck>();
        let stop_timeout = self.stop_timeout;
        let handle = tokio::spawn(async move {
            supervise_instance(child, number, stop_rx, stop_timeout).await;
        });

        Ok(RunningInstance {
            number,
            pid,
            stop_tx,
            handle,
        })
    }

    async fn stop_current(&mut self) -> crate::errors::Result<()> {
        let Some(instance) = self.current.take() else {
            debug!("no instance to stop");
            return Ok(());
        };

        let number = instance.number;
        info!(instance = number, pid = ?instance.pid, "stopping instance");

        let (ack_tx, ack_rx) = oneshot::channel();
        if instance.stop_tx.send(ack_tx).is_ok() {
            match ack_rx.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    return Err(DevloopError::StopFailed(format!(
                        "instance {number}: {e:#}"
                    )));
                }
                Err(_) => {
                    debug!(instance = number, "instance exited before the stop request was seen");
                }
            }
        } else {
            debug!(instance = number, "instance had already exited");
        }

        // The supervising task finishes right after acknowledging.
        if let Err(e) = instance.handle.await {
            warn!(instance = number, error = %e, "instance task ended abnormally");
        }

        info!(instance = number, "instance stopped");
        Ok(())
    }
}

impl ProcessBackend for ProcessSupervisor {
    fn run(&mut self) {
        if self.is_running() {
            error!(
                pid = ?self.pid(),
                "an instance is still running; refusing to start another"
            );
            return;
        }

        match self.spawn_instance() {
            Ok(instance) => self.current = Some(instance),
            Err(err) => {
                self.current = None;
                error!(error = %err, "failed to start instance");
            }
        }
    }

    fn stop(&mut self) -> BackendFuture<'_, crate::errors::Result<()>> {
        Box::pin(self.stop_current())
    }
}

/// Forward a child's output stream to the log, line by line.
fn forward_output<R>(stream: Option<R>, instance: u64, stream_name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(stream) = stream else {
        return;
    };

    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(target: APP_TARGET, instance, stream = stream_name, "{}", line);
        }
    });
}

/// Own the child until it exits by itself or a stop request arrives.
async fn supervise_instance(
    mut child: Child,
    instance: u64,
    stop_rx: oneshot::Receiver<StopAck>,
    stop_timeout: Duration,
) {
    tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => info!(
                    instance,
                    exit_code = status.code().unwrap_or(-1),
                    success = status.success(),
                    "instance exited"
                ),
                Err(e) => warn!(instance, error = %e, "failed waiting for instance"),
            }
        }

        request = stop_rx => {
            match request {
                Ok(ack) => {
                    let result = terminate(&mut child, instance, stop_timeout).await;
                    let _ = ack.send(result);
                }
                Err(_) => {
                    // Supervisor dropped; kill_on_drop takes care of the child.
                    debug!(instance, "stop channel closed without a request");
                }
            }
        }
    }
}

/// Terminate the child: polite request first (Unix), then kill. Returns
/// once the child has been reaped.
async fn terminate(child: &mut Child, instance: u64, grace: Duration) -> Result<()> {
    if let Some(status) = child.try_wait().context("polling instance")? {
        debug!(instance, exit_code = status.code().unwrap_or(-1), "instance already exited");
        return Ok(());
    }

    if !grace.is_zero() && request_graceful_stop(child) {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                let status = status.context("waiting for instance to exit")?;
                info!(instance, exit_code = status.code().unwrap_or(-1), "instance exited after stop request");
                return Ok(());
            }
            Err(_) => {
                warn!(
                    instance,
                    grace_ms = grace.as_millis() as u64,
                    "instance did not exit in time; killing"
                );
            }
        }
    }

    if child.try_wait().context("polling instance")?.is_some() {
        return Ok(());
    }
    child.kill().await.context("killing instance")?;
    info!(instance, "instance killed");
    Ok(())
}

#[cfg(unix)]
fn request_graceful_stop(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: plain syscall on a pid we spawned and have not reaped yet.
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn request_graceful_stop(_child: &Child) -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str, grace: Duration) -> ProcessSupervisor {
        ProcessSupervisor::new(
            "/bin/sh",
            vec!["-c".to_string(), script.to_string()],
            std::env::temp_dir(),
            grace,
        )
    }

    #[tokio::test]
    async fn stop_without_instance_is_ok() {
        let mut sup = shell("true", Duration::from_millis(100));
        sup.stop().await.unwrap();
        assert!(!sup.is_running());
    }

    #[tokio::test]
    async fn run_then_stop_terminates_gracefully() {
        let mut sup = shell(
            "trap 'exit 0' TERM; while true; do sleep 0.05; done",
            Duration::from_secs(5),
        );
        sup.run();
        assert!(sup.is_running());
        assert!(sup.pid().is_some());

        sup.stop().await.unwrap();
        assert!(!sup.is_running());
    }

    #[tokio::test]
    async fn instance_ignoring_sigterm_is_killed_after_grace() {
        let mut sup = shell(
            "trap '' TERM; while true; do sleep 0.05; done",
            Duration::from_millis(200),
        );
        sup.run();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        sup.stop().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(!sup.is_running());
    }

    #[tokio::test]
    async fn stop_after_instance_exited_on_its_own() {
        let mut sup = shell("exit 3", Duration::from_millis(100));
        sup.run();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!sup.is_running());
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn second_run_without_stop_is_refused() {
        let mut sup = shell("sleep 5", Duration::ZERO);
        sup.run();
        let first = sup.pid();
        sup.run();
        assert_eq!(sup.pid(), first, "running instance must not be replaced");
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn missing_artifact_is_logged_not_fatal() {
        let mut sup = ProcessSupervisor::new(
            "/definitely/not/here",
            Vec::new(),
            std::env::temp_dir(),
            Duration::ZERO,
        );
        sup.run();
        assert!(!sup.is_running());
        sup.stop().await.unwrap();
    }
}
