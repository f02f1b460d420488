// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    /// The very first build failed, so there is no instance to fall back to.
    #[error("initial build failed:\n{0}")]
    InitialBuildFailed(String),

    /// The running instance could not be stopped.
    #[error("failed to stop running instance: {0}")]
    StopFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DevloopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_build_failure_carries_diagnostics() {
        let err = DevloopError::InitialBuildFailed("syntax error".to_string());
        let msg = err.to_string();
        assert!(msg.starts_with("initial build failed"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn anyhow_errors_convert_transparently() {
        let err: DevloopError = anyhow::anyhow!("spawn failed").into();
        assert!(matches!(err, DevloopError::Other(_)));
        assert_eq!(err.to_string(), "spawn failed");
    }
}
