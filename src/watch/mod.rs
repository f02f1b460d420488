// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which paths matter (`filter`: extensions, exclude globs, the
//!   scratch directory).
//! - Wiring up a cross-platform filesystem watcher (`notify`) that feeds the
//!   supervisor's change-event queue.
//!
//! It does **not** know about builds or processes; it only turns filesystem
//! changes into `ChangeEvent`s.

pub mod filter;
pub mod watcher;

pub use filter::{relative_to, WatchFilter};
pub use watcher::{spawn_watcher, WatcherHandle};
