use std::fmt;
use std::path::Path;

/// Environment variable set on every process devloop spawns, so tooling in
/// the build and in the running instance can tell it lives under the loop.
pub const DEV_RUNNER_ENV: &str = "DEV_RUNNER";

/// Something changed.
///
/// The payload is only used for logging; the loop cares about how many
/// events arrive and when, not what they say.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent(String);

impl ChangeEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The synthetic event sent at startup to force the first build.
    pub fn initial() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeEvent {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&Path> for ChangeEvent {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

/// Result of one build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub success: bool,
    /// Compiler output. Usually empty (or warnings only) on success.
    pub diagnostics: String,
}

impl BuildOutcome {
    pub fn succeeded(diagnostics: impl Into<String>) -> Self {
        Self {
            success: true,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostics: diagnostics.into(),
        }
    }
}
