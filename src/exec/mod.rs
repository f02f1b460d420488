// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the build command and
//! the built artifact, using `tokio::process::Command`.
//!
//! - [`backend`] provides the `BuildBackend` / `ProcessBackend` traits the
//!   supervisor loop is written against.
//! - [`build`] runs the configured build command and captures diagnostics.
//! - [`process`] starts and stops the artifact, one instance at a time.

pub mod backend;
pub mod build;
pub mod process;

pub use backend::{BackendFuture, BuildBackend, ProcessBackend};
pub use build::CommandBuilder;
pub use process::ProcessSupervisor;

use tokio::process::Command;

/// Build a shell command appropriate for the platform.
pub(crate) fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}
