#![allow(dead_code)]

use devloop::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with an artifact already set, so
/// `build()` succeeds unless a test breaks something on purpose.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.run.artifact = "target/debug/app".to_string();
        Self { config }
    }

    pub fn build_cmd(mut self, cmd: &str) -> Self {
        self.config.build.cmd = cmd.to_string();
        self
    }

    pub fn build_arg(mut self, arg: &str) -> Self {
        self.config.build.args.push(arg.to_string());
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.config.build.delay_ms = ms;
        self
    }

    pub fn artifact(mut self, path: &str) -> Self {
        self.config.run.artifact = path.to_string();
        self
    }

    pub fn run_arg(mut self, arg: &str) -> Self {
        self.config.run.args.push(arg.to_string());
        self
    }

    pub fn stop_timeout_ms(mut self, ms: u64) -> Self {
        self.config.run.stop_timeout_ms = ms;
        self
    }

    pub fn root(mut self, root: &str) -> Self {
        self.config.watch.root = root.to_string();
        self
    }

    pub fn extensions(mut self, exts: &[&str]) -> Self {
        self.config.watch.extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
