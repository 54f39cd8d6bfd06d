use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{Interpreter, InterpreterTable, Language, Platform};
use crate::types::{MountConfig, ResourceLimits};

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../forgejail.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("no interpreter configured for {language} on {platform}")]
    InterpreterNotFound {
        platform: Platform,
        language: Language,
    },

    #[error("unsupported platform '{0}'")]
    UnsupportedPlatform(String),

    #[error("unknown language '{0}'")]
    UnknownLanguage(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Forgejail
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the nsjail binary (resolved through PATH if it has no '/').
    #[serde(default = "default_nsjail_path")]
    pub nsjail_path: PathBuf,

    /// Path to GNU time, which appends the `<elapsed> <peak-memory>` line
    /// to the program's stderr.
    #[serde(default = "default_time_path")]
    pub time_path: PathBuf,

    /// Identity, environment and mounts used for every jail
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Default resource limits applied to all executions.
    /// Requests may override individual fields.
    #[serde(default)]
    pub default_limits: ResourceLimits,

    /// Outer wall-clock watchdog settings
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// Interpreter invocations per platform and language
    #[serde(default)]
    pub interpreters: InterpreterTable,
}

/// Settings for the nsjail invocation
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    /// Unprivileged user id inside the jail
    #[serde(default = "default_jail_id")]
    pub user: u32,

    /// Unprivileged group id inside the jail
    #[serde(default = "default_jail_id")]
    pub group: u32,

    /// Pass the caller's environment into the jail (`--keep_env`)
    #[serde(default = "default_true")]
    pub keep_env: bool,

    /// Silence nsjail's own logging (`-q`)
    #[serde(default = "default_true")]
    pub quiet: bool,

    /// Read-only system mounts; the working directory is added per execution
    #[serde(default = "default_system_mounts")]
    pub mounts: Vec<MountConfig>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            user: default_jail_id(),
            group: default_jail_id(),
            keep_env: true,
            quiet: true,
            mounts: default_system_mounts(),
        }
    }
}

/// Settings for the watchdog layered above nsjail's own time limit
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WatchdogConfig {
    /// Seconds added to the time limit before the watchdog fires
    #[serde(default = "default_grace")]
    pub grace: f64,

    /// Seconds to wait for the killed process group to be reaped
    #[serde(default = "default_reap_timeout")]
    pub reap_timeout: f64,
}

impl WatchdogConfig {
    /// Largest accepted grace or reap timeout in seconds
    pub const MAX_SECONDS: f64 = 3600.0;

    /// Check that both settings are usable durations.
    ///
    /// Grace must be positive so the window always outlasts the sandbox limit.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.grace > 0.0 && self.grace <= Self::MAX_SECONDS) {
            return Err(format!(
                "watchdog grace must be in (0, {}] seconds, got {}",
                Self::MAX_SECONDS,
                self.grace
            ));
        }
        if !(self.reap_timeout >= 0.0 && self.reap_timeout <= Self::MAX_SECONDS) {
            return Err(format!(
                "watchdog reap_timeout must be in [0, {}] seconds, got {}",
                Self::MAX_SECONDS,
                self.reap_timeout
            ));
        }
        Ok(())
    }

    /// Watchdog window for the time limit the sandbox enforces, in whole seconds
    pub fn window(&self, sandbox_seconds: u64) -> Result<Duration, String> {
        self.validate()?;
        Duration::from_secs(sandbox_seconds)
            .checked_add(Duration::from_secs_f64(self.grace))
            .ok_or_else(|| format!("watchdog window overflows for {sandbox_seconds}s"))
    }

    pub fn reap_timeout(&self) -> Result<Duration, String> {
        self.validate()?;
        Ok(Duration::from_secs_f64(self.reap_timeout))
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            grace: default_grace(),
            reap_timeout: default_reap_timeout(),
        }
    }
}

impl Config {
    /// Create a config with no interpreters
    pub fn empty() -> Self {
        Self {
            nsjail_path: default_nsjail_path(),
            time_path: default_time_path(),
            sandbox: SandboxConfig::default(),
            default_limits: ResourceLimits::default(),
            watchdog: WatchdogConfig::default(),
            interpreters: InterpreterTable::new(),
        }
    }

    /// Get the interpreter for a language on the current platform
    pub fn interpreter(&self, language: Language) -> Result<&Interpreter, ConfigError> {
        self.interpreters.resolve(Platform::current()?, language)
    }

    /// Merge request limits over the configured defaults.
    ///
    /// Fields neither sets fall back to the built-in defaults, so the result
    /// always carries both limits.
    pub fn effective_limits(&self, overrides: Option<&ResourceLimits>) -> ResourceLimits {
        let limits = ResourceLimits::default().with_overrides(&self.default_limits);
        match overrides {
            Some(overrides) => limits.with_overrides(overrides),
            None => limits,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_nsjail_path() -> PathBuf {
    PathBuf::from("nsjail")
}

fn default_time_path() -> PathBuf {
    PathBuf::from("/usr/bin/time")
}

fn default_jail_id() -> u32 {
    99999
}

fn default_true() -> bool {
    true
}

fn default_grace() -> f64 {
    0.5
}

fn default_reap_timeout() -> f64 {
    1.0
}

fn default_system_mounts() -> Vec<MountConfig> {
    vec![
        MountConfig::read_only("/bin"),
        MountConfig::read_only("/lib"),
        MountConfig::read_only("/lib64").optional(),
        MountConfig::read_only("/usr"),
        MountConfig::read_only("/etc/alternatives").optional(),
    ]
}
