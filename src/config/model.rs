// src/config/model.rs

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [build]
/// cmd = "cargo build"
/// delay_ms = 600
///
/// [run]
/// artifact = "target/debug/app"
/// args = ["--port", "8080"]
///
/// [watch]
/// extensions = ["rs", "toml"]
/// exclude = ["target/**"]
/// ```
///
/// All sections are optional and have reasonable defaults, except that
/// `run.artifact` must end up set (from the file or the CLI).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration. Construct through `ConfigFile::try_from`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub build: BuildSection,
    pub run: RunSection,
    pub watch: WatchSection,
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Shell command line that compiles the program.
    #[serde(default = "default_build_cmd")]
    pub cmd: String,

    /// Extra arguments appended to `cmd`, one word each. They are quoted
    /// for the shell, so spaces and `;` reach the build tool unchanged.
    /// Shell syntax belongs in `cmd`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Debounce delay: how long to wait after the first change of a burst
    /// before building.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// File name of the build-failure record, inside `watch.tmp_dir`.
    #[serde(default = "default_error_log")]
    pub error_log: String,
}

fn default_build_cmd() -> String {
    "cargo build".to_string()
}

fn default_delay_ms() -> u64 {
    600
}

fn default_error_log() -> String {
    "build-errors.log".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            cmd: default_build_cmd(),
            args: Vec::new(),
            delay_ms: default_delay_ms(),
            error_log: default_error_log(),
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Path of the built program, relative to `watch.root` unless absolute.
    #[serde(default)]
    pub artifact: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Grace period between asking the instance to stop and killing it.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_stop_timeout_ms() -> u64 {
    5000
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            artifact: String::new(),
            args: Vec::new(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(default = "default_root")]
    pub root: String,

    /// Scratch directory (relative to `root`). Never watched; holds the
    /// build-failure record.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,

    /// File extensions that trigger a rebuild (`"rs"` or `".rs"`). Empty
    /// means every file.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns, relative to `root`, that never trigger a rebuild.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_tmp_dir() -> String {
    "tmp".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["rs".to_string(), "toml".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["target/**".to_string(), ".git/**".to_string()]
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            tmp_dir: default_tmp_dir(),
            extensions: default_extensions(),
            exclude: default_exclude(),
        }
    }
}

impl ConfigFile {
    /// Only for use after validation.
    pub(crate) fn new_unchecked(build: BuildSection, run: RunSection, watch: WatchSection) -> Self {
        Self { build, run, watch }
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.watch.root)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root().join(&self.watch.tmp_dir)
    }

    /// Where the last non-fatal build failure is written.
    pub fn build_log_path(&self) -> PathBuf {
        self.tmp_dir().join(&self.build.error_log)
    }

    pub fn build_delay(&self) -> Duration {
        Duration::from_millis(self.build.delay_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.run.stop_timeout_ms)
    }

    pub fn artifact_path(&self) -> PathBuf {
        let artifact = Path::new(&self.run.artifact);
        if artifact.is_absolute() {
            artifact.to_path_buf()
        } else {
            self.root().join(artifact)
        }
    }

    /// Build command line with `build.args` appended, each quoted for the
    /// shell.
    pub fn build_command_line(&self) -> String {
        let mut line = self.build.cmd.trim().to_string();
        for arg in &self.build.args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }
}

/// Quote `arg` as a single word for `sh -c` (or `cmd /C` on Windows).
fn shell_quote(arg: &str) -> Cow<'_, str> {
    let plain = |c: char| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c);
    if !arg.is_empty() && arg.chars().all(plain) {
        return Cow::Borrowed(arg);
    }

    if cfg!(windows) {
        Cow::Owned(format!("\"{}\"", arg.replace('"', "\"\"")))
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', "'\\''")))
    }
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub build_cmd: Option<String>,
    pub build_args: Option<Vec<String>>,
    pub build_delay_ms: Option<u64>,
    pub artifact: Option<String>,
    pub run_args: Option<Vec<String>>,
    /// Replaces `watch.extensions` when non-empty.
    pub extensions: Vec<String>,
    /// Appended to `watch.exclude`.
    pub exclude: Vec<String>,
}

impl Overrides {
    pub fn apply(&self, raw: &mut RawConfigFile) {
        if let Some(cmd) = &self.build_cmd {
            raw.build.cmd = cmd.clone();
        }
        if let Some(args) = &self.build_args {
            raw.build.args = args.clone();
        }
        if let Some(delay) = self.build_delay_ms {
            raw.build.delay_ms = delay;
        }
        if let Some(artifact) = &self.artifact {
            raw.run.artifact = artifact.clone();
        }
        if let Some(args) = &self.run_args {
            raw.run.args = args.clone();
        }
        if !self.extensions.is_empty() {
            raw.watch.extensions = self.extensions.clone();
        }
        raw.watch.exclude.extend(self.exclude.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let raw: RawConfigFile = toml::from_str("").unwrap();
        assert_eq!(raw.build.cmd, "cargo build");
        assert_eq!(raw.build.delay_ms, 600);
        assert_eq!(raw.run.stop_timeout_ms, 5000);
        assert_eq!(raw.watch.tmp_dir, "tmp");
        assert!(raw.run.artifact.is_empty());
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut raw: RawConfigFile = toml::from_str(
            r#"
[build]
cmd = "make"
delay_ms = 100

[watch]
extensions = ["c"]
exclude = ["build/**"]
"#,
        )
        .unwrap();

        let overrides = Overrides {
            build_delay_ms: Some(250),
            artifact: Some("bin/app".to_string()),
            extensions: vec!["h".to_string()],
            exclude: vec!["vendor/**".to_string()],
            ..Default::default()
        };
        overrides.apply(&mut raw);

        assert_eq!(raw.build.cmd, "make");
        assert_eq!(raw.build.delay_ms, 250);
        assert_eq!(raw.run.artifact, "bin/app");
        assert_eq!(raw.watch.extensions, vec!["h".to_string()]);
        assert_eq!(
            raw.watch.exclude,
            vec!["build/**".to_string(), "vendor/**".to_string()]
        );
    }

    #[test]
    fn derived_paths_hang_off_root() {
        let mut raw = RawConfigFile::default();
        raw.watch.root = "proj".to_string();
        raw.run.artifact = "out/app".to_string();
        raw.build.args = vec!["--release".to_string()];
        let cfg = ConfigFile::new_unchecked(raw.build, raw.run, raw.watch);

        assert_eq!(cfg.build_log_path(), PathBuf::from("proj/tmp/build-errors.log"));
        assert_eq!(cfg.artifact_path(), PathBuf::from("proj/out/app"));
        assert_eq!(cfg.build_command_line(), "cargo build --release");
        assert_eq!(cfg.build_delay(), Duration::from_millis(600));
    }

    #[cfg(unix)]
    #[test]
    fn build_args_are_quoted_one_word_each() {
        let mut raw = RawConfigFile::default();
        raw.build.args = vec![
            "--features".to_string(),
            "a b".to_string(),
            "x;rm -rf y".to_string(),
            "it's".to_string(),
            String::new(),
        ];
        let cfg = ConfigFile::new_unchecked(raw.build, raw.run, raw.watch);

        assert_eq!(
            cfg.build_command_line(),
            r"cargo build --features 'a b' 'x;rm -rf y' 'it'\''s' ''"
        );
    }
}
