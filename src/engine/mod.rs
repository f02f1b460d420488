// src/engine/mod.rs

//! Rebuild/restart orchestration.
//!
//! This module ties together:
//! - the change-event queue and burst coalescing ([`debounce`])
//! - the pure loop core deciding what to do after each build ([`core`])
//! - the advisory build-failure record ([`build_log`])
//! - the async supervisor loop driving builds and restarts ([`supervisor`])

use crate::types::BuildOutcome;

/// Capacity of the change-event queue. Large enough that the watcher never
/// blocks under normal churn.
pub const EVENT_QUEUE_CAPACITY: usize = 1000;

/// Events fed into the loop core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// A build attempt finished.
    BuildFinished(BuildOutcome),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Why the supervisor loop returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A shutdown was requested through the handle.
    Shutdown,
    /// Every event sender was dropped.
    ChannelClosed,
}

pub mod build_log;
pub mod core;
pub mod debounce;
pub mod supervisor;

pub use build_log::BuildErrorLog;
pub use core::{CoreCommand, CoreRuntime, CoreStep, LoopState};
pub use debounce::{event_channel, Burst, Debouncer, EventSender};
pub use supervisor::{Supervisor, SupervisorHandle, SupervisorOptions};
