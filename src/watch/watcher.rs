// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, trace, warn};

use crate::engine::EventSender;
use crate::types::ChangeEvent;
use crate::watch::filter::{relative_to, WatchFilter};

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and push a [`ChangeEvent`] for every changed
/// path that passes `filter`.
///
/// Events are queued with `try_send` straight from notify's callback thread.
/// A full queue means a rebuild is already pending, so the event is dropped.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    filter: WatchFilter,
    events: EventSender,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let callback_root = root.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                forward_event(&callback_root, &filter, &events, event);
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    Ok(WatcherHandle { _inner: watcher })
}

/// Filter one notify event and queue a change for each watched path.
/// Returns how many changes were queued.
pub(crate) fn forward_event(
    root: &Path,
    filter: &WatchFilter,
    events: &EventSender,
    event: Event,
) -> usize {
    if matches!(event.kind, EventKind::Access(_)) {
        trace!(?event, "ignoring access event");
        return 0;
    }

    let mut queued = 0;
    for path in &event.paths {
        let Some(rel) = relative_to(root, path) else {
            debug!(?path, ?root, "event path outside watch root");
            continue;
        };
        if !filter.is_watched(&rel) {
            trace!(path = ?rel, "ignoring unwatched path");
            continue;
        }

        debug!(path = ?rel, kind = ?event.kind, "sending change event");
        match events.try_send(ChangeEvent::from(rel.as_path())) {
            Ok(()) => queued += 1,
            Err(TrySendError::Full(_)) => {
                debug!(path = ?rel, "event queue full; rebuild already pending");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(path = ?rel, "event queue closed; dropping change");
            }
        }
    }
    queued
}
