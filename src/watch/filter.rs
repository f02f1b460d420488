// src/watch/filter.rs

//! Decide which changed paths are worth a rebuild.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;

/// Extension + exclude-glob filter, evaluated on paths relative to the
/// watch root.
///
/// A path is watched when:
/// - it is not inside the scratch directory,
/// - no exclude glob matches it,
/// - its extension is listed (or the extension list is empty).
#[derive(Clone)]
pub struct WatchFilter {
    extensions: Vec<String>,
    exclude: GlobSet,
    tmp_dir: PathBuf,
}

impl fmt::Debug for WatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchFilter")
            .field("extensions", &self.extensions)
            .field("tmp_dir", &self.tmp_dir)
            .finish_non_exhaustive()
    }
}

impl WatchFilter {
    pub fn new(extensions: &[String], exclude: &[String], tmp_dir: impl AsRef<Path>) -> Result<Self> {
        let extensions = extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| !ext.is_empty())
            .collect();

        Ok(Self {
            extensions,
            exclude: build_globset(exclude).context("building exclude globset")?,
            tmp_dir: normalize(tmp_dir.as_ref()),
        })
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::new(&cfg.watch.extensions, &cfg.watch.exclude, &cfg.watch.tmp_dir)
    }

    /// `rel_path` is relative to the watch root.
    pub fn is_watched(&self, rel_path: &Path) -> bool {
        let rel_path = normalize(rel_path);

        if rel_path.as_os_str().is_empty() {
            return false;
        }
        if !self.tmp_dir.as_os_str().is_empty() && rel_path.starts_with(&self.tmp_dir) {
            return false;
        }
        if self.exclude.is_match(&rel_path) {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }

        rel_path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

/// `".RS"` and `"rs"` both become `"rs"`.
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Drop `.` components so `./tmp` and `tmp` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Express `path` relative to `root`.
///
/// Tries a plain prefix strip first, then canonicalizes both sides, which
/// matters where the OS reports events through a different prefix than the
/// one we watched (symlinks, `/private/var` on macOS).
pub fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }

    let root_canon = root.canonicalize().ok()?;
    // Removed files cannot be canonicalized; fall back to their parent.
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_path_buf())
}
