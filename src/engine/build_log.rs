// src/engine/build_log.rs

//! Advisory record of the last non-fatal build failure.
//!
//! Editors and status bars can read this file to show why the running
//! program is stale. Nothing here can fail the loop: IO errors are logged
//! and swallowed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::fs::FileSystem;

#[derive(Clone)]
pub struct BuildErrorLog {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for BuildErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildErrorLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl BuildErrorLog {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the record, if any.
    pub fn clear(&self) {
        if !self.fs.exists(&self.path) {
            return;
        }
        match self.fs.remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "removed build error log"),
            Err(e) => warn!(path = ?self.path, error = %e, "failed to remove build error log"),
        }
    }

    /// Replace the record with `diagnostics`.
    pub fn record(&self, diagnostics: &str) {
        match self.fs.write(&self.path, diagnostics.as_bytes()) {
            Ok(()) => debug!(path = ?self.path, "wrote build error log"),
            Err(e) => warn!(path = ?self.path, error = %e, "failed to write build error log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn record_then_clear() {
        let fs = MockFileSystem::new();
        let log = BuildErrorLog::new("tmp/build-errors.log", Arc::new(fs.clone()));

        log.record("type error");
        assert_eq!(
            fs.read_to_string(Path::new("tmp/build-errors.log")).unwrap(),
            "type error"
        );

        log.clear();
        assert!(!fs.exists(Path::new("tmp/build-errors.log")));
    }

    #[test]
    fn clearing_a_missing_record_is_quiet() {
        let fs = MockFileSystem::new();
        let log = BuildErrorLog::new("tmp/build-errors.log", Arc::new(fs.clone()));
        log.clear();
        log.clear();
        assert!(!fs.exists(log.path()));
    }

    #[test]
    fn write_failure_does_not_panic() {
        let fs = MockFileSystem::new();
        fs.fail_writes(true);
        let log = BuildErrorLog::new("tmp/build-errors.log", Arc::new(fs.clone()));
        log.record("boom");
        assert!(!fs.exists(log.path()));
    }
}
