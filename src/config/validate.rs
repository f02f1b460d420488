// src/config/validate.rs

use std::path::{Component, Path};

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DevloopError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::DevloopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.build, raw.run, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_build(cfg)?;
    validate_run(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn validate_build(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.cmd.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[build].cmd must not be empty".to_string(),
        ));
    }
    if cfg.build.error_log.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[build].error_log must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_run(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.artifact.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[run].artifact must be set (in the config file or with --artifact)".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.tmp_dir.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[watch].tmp_dir must not be empty".to_string(),
        ));
    }

    // The watch filter skips the scratch directory by its root-relative path.
    let tmp_dir = Path::new(&cfg.watch.tmp_dir);
    if tmp_dir.has_root()
        || tmp_dir
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(DevloopError::ConfigError(format!(
            "[watch].tmp_dir must be a path inside [watch].root, relative to it (got {:?})",
            cfg.watch.tmp_dir
        )));
    }

    for ext in cfg.watch.extensions.iter() {
        if ext.trim().trim_start_matches('.').is_empty() {
            return Err(DevloopError::ConfigError(format!(
                "[watch].extensions contains an empty extension ({:?})",
                ext
            )));
        }
    }

    for pattern in cfg.watch.exclude.iter() {
        if let Err(e) = Glob::new(pattern) {
            return Err(DevloopError::ConfigError(format!(
                "invalid exclude pattern '{}': {}",
                pattern, e
            )));
        }
    }

    Ok(())
}
