// src/engine/core.rs

//! Pure core of the supervisor loop.
//!
//! `CoreRuntime` owns the [`LoopState`] and turns [`LoopEvent`]s into a list
//! of [`CoreCommand`]s for the async shell (`engine::supervisor`) to carry
//! out, in order. It has no channels, no Tokio types and performs no IO, so
//! every build/restart decision can be unit tested directly.

use crate::engine::LoopEvent;
use crate::types::BuildOutcome;

/// State owned by the loop and nothing else.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopState {
    /// Number of times the loop has entered Idle. Diagnostic only.
    pub iteration: u64,
    /// False until the first successful build; never reset.
    pub started: bool,
}

/// Command produced by the core, to be executed by the supervisor shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Persist build diagnostics to the build-failure record.
    RecordFailure(String),
    /// Stop the running instance and wait until it is gone. If this fails,
    /// the remaining commands of the step are skipped.
    StopInstance,
    /// Start a new instance of the freshly built artifact.
    StartInstance,
    /// Terminate the whole loop with a fatal build failure.
    Abort(String),
}

/// Decision returned by the core after handling a single `LoopEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the loop should go back to Idle afterwards.
    pub keep_running: bool,
}

#[derive(Debug, Default)]
pub struct CoreRuntime {
    state: LoopState,
}

impl CoreRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Enter Idle for a new iteration and return its number (1-based).
    pub fn begin_iteration(&mut self) -> u64 {
        self.state.iteration += 1;
        self.state.iteration
    }

    pub fn step(&mut self, event: LoopEvent) -> CoreStep {
        match event {
            LoopEvent::BuildFinished(outcome) => handle_build_finished(&mut self.state, outcome),
            LoopEvent::ShutdownRequested => handle_shutdown(&self.state),
        }
    }
}

fn handle_build_finished(state: &mut LoopState, outcome: BuildOutcome) -> CoreStep {
    if !outcome.success {
        if !state.started {
            // Nothing to fall back to.
            return CoreStep {
                commands: vec![CoreCommand::Abort(outcome.diagnostics)],
                keep_running: false,
            };
        }

        return CoreStep {
            commands: vec![CoreCommand::RecordFailure(outcome.diagnostics)],
            keep_running: true,
        };
    }

    let mut commands = Vec::with_capacity(2);
    if state.started {
        commands.push(CoreCommand::StopInstance);
    }
    commands.push(CoreCommand::StartInstance);
    state.started = true;

    CoreStep {
        commands,
        keep_running: true,
    }
}

fn handle_shutdown(state: &LoopState) -> CoreStep {
    let commands = if state.started {
        vec![CoreCommand::StopInstance]
    } else {
        Vec::new()
    };

    CoreStep {
        commands,
        keep_running: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> LoopEvent {
        LoopEvent::BuildFinished(BuildOutcome::succeeded(""))
    }

    fn fail(msg: &str) -> LoopEvent {
        LoopEvent::BuildFinished(BuildOutcome::failed(msg))
    }

    #[test]
    fn first_success_starts_without_stopping() {
        let mut core = CoreRuntime::new();
        let step = core.step(ok());
        assert_eq!(step.commands, vec![CoreCommand::StartInstance]);
        assert!(step.keep_running);
        assert!(core.state().started);
    }

    #[test]
    fn first_failure_aborts_and_never_starts() {
        let mut core = CoreRuntime::new();
        let step = core.step(fail("syntax error"));
        assert_eq!(
            step.commands,
            vec![CoreCommand::Abort("syntax error".to_string())]
        );
        assert!(!step.keep_running);
        assert!(!core.state().started);
    }

    #[test]
    fn later_failure_is_recorded_and_leaves_instance_alone() {
        let mut core = CoreRuntime::new();
        core.step(ok());
        let step = core.step(fail("type error"));
        assert_eq!(
            step.commands,
            vec![CoreCommand::RecordFailure("type error".to_string())]
        );
        assert!(step.keep_running);
        assert!(core.state().started, "started is never reset");
    }

    #[test]
    fn later_success_stops_before_starting() {
        let mut core = CoreRuntime::new();
        core.step(ok());
        core.step(fail("type error"));
        let step = core.step(ok());
        assert_eq!(
            step.commands,
            vec![CoreCommand::StopInstance, CoreCommand::StartInstance]
        );
    }

    #[test]
    fn shutdown_stops_only_when_something_was_started() {
        let mut core = CoreRuntime::new();
        let step = core.step(LoopEvent::ShutdownRequested);
        assert!(step.commands.is_empty());
        assert!(!step.keep_running);

        core.step(ok());
        let step = core.step(LoopEvent::ShutdownRequested);
        assert_eq!(step.commands, vec![CoreCommand::StopInstance]);
    }

    #[test]
    fn iteration_counter_is_monotonic() {
        let mut core = CoreRuntime::new();
        assert_eq!(core.begin_iteration(), 1);
        assert_eq!(core.begin_iteration(), 2);
        core.step(ok());
        assert_eq!(core.begin_iteration(), 3);
        assert_eq!(core.state().iteration, 3);
    }
}
