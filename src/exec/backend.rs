// src/exec/backend.rs

//! Pluggable build and process backends.
//!
//! The supervisor loop talks to a `BuildBackend` and a `ProcessBackend`
//! instead of spawning commands itself. Production code uses
//! [`CommandBuilder`](super::CommandBuilder) and
//! [`ProcessSupervisor`](super::ProcessSupervisor); tests swap in fakes that
//! script build outcomes and record starts/stops.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::types::BuildOutcome;

/// Boxed future returned by backend methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compiles the program.
pub trait BuildBackend: Send {
    /// Run one build to completion. Never fails as such: problems launching
    /// the build are reported as a failed outcome.
    fn build(&mut self) -> BackendFuture<'_, BuildOutcome>;
}

/// Owns the (at most one) running instance of the built artifact.
pub trait ProcessBackend: Send {
    /// Start a new instance and return without waiting for it. Failures are
    /// logged by the implementation.
    fn run(&mut self);

    /// Stop the current instance and resolve once it no longer holds any
    /// resources. Resolves `Ok` straight away if nothing is running.
    fn stop(&mut self) -> BackendFuture<'_, Result<()>>;
}
