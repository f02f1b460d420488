use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use devloop::errors::{DevloopError, Result};
use devloop::exec::{BackendFuture, BuildBackend, ProcessBackend};
use devloop::types::BuildOutcome;

/// A fake build that:
/// - hands out scripted outcomes in order (success once the script runs out)
/// - records when each build started, in tokio time.
#[derive(Clone, Default)]
pub struct FakeBuilder {
    script: Arc<Mutex<VecDeque<BuildOutcome>>>,
    started: Arc<Mutex<Vec<Instant>>>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = BuildOutcome>) -> Self {
        let fake = Self::new();
        fake.script.lock().unwrap().extend(outcomes);
        fake
    }

    pub fn builds(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    pub fn build_times(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

impl BuildBackend for FakeBuilder {
    fn build(&mut self) -> BackendFuture<'_, BuildOutcome> {
        let script = Arc::clone(&self.script);
        let started = Arc::clone(&self.started);

        Box::pin(async move {
            started.lock().unwrap().push(Instant::now());
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| BuildOutcome::succeeded(""))
        })
    }
}

/// What the loop asked the fake process backend to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessCall {
    Run,
    Stop,
}

#[derive(Debug, Default)]
struct ProcessState {
    calls: Vec<ProcessCall>,
    alive: usize,
    max_alive: usize,
    fail_stops: bool,
}

/// A fake process backend that:
/// - records every run/stop call in order
/// - tracks how many instances would be alive at once
/// - can be told to fail stops.
#[derive(Debug, Clone, Default)]
pub struct FakeProcesses {
    state: Arc<Mutex<ProcessState>>,
}

impl FakeProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_stops(&self, fail: bool) {
        self.state.lock().unwrap().fail_stops = fail;
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn runs(&self) -> usize {
        self.count(ProcessCall::Run)
    }

    pub fn stops(&self) -> usize {
        self.count(ProcessCall::Stop)
    }

    pub fn alive(&self) -> usize {
        self.state.lock().unwrap().alive
    }

    pub fn max_alive(&self) -> usize {
        self.state.lock().unwrap().max_alive
    }

    fn count(&self, call: ProcessCall) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }
}

impl ProcessBackend for FakeProcesses {
    fn run(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProcessCall::Run);
        state.alive += 1;
        state.max_alive = state.max_alive.max(state.alive);
    }

    fn stop(&mut self) -> BackendFuture<'_, Result<()>> {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let mut state = state.lock().unwrap();
            state.calls.push(ProcessCall::Stop);
            if state.fail_stops {
                return Err(DevloopError::StopFailed("scripted stop failure".to_string()));
            }
            state.alive = state.alive.saturating_sub(1);
            Ok(())
        })
    }
}
