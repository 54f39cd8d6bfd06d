use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Language;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU time limit in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,

    /// Address-space limit in kilobytes
    #[serde(default)]
    pub memory_limit: Option<u64>,
}

impl ResourceLimits {
    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;

    /// Time limit used when neither the config nor the request sets one
    pub const DEFAULT_TIME_LIMIT: f64 = 5.0;
    /// Largest accepted time limit in seconds
    pub const MAX_TIME_LIMIT: f64 = 86_400.0;
    /// Memory limit used when neither the config nor the request sets one
    pub const DEFAULT_MEMORY_LIMIT: u64 = 1000 * Self::MB;

    /// Create limits with nothing set, for use as request overrides
    pub fn none() -> Self {
        Self {
            time_limit: None,
            memory_limit: None,
        }
    }

    /// Set the CPU time limit in seconds
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the memory limit in kilobytes
    pub fn with_memory_limit(mut self, kb: u64) -> Self {
        self.memory_limit = Some(kb);
        self
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            time_limit: overrides.time_limit.or(self.time_limit),
            memory_limit: overrides.memory_limit.or(self.memory_limit),
        }
    }

    /// Time limit as the sandbox enforces it: whole seconds, rounded up.
    ///
    /// Never 0, since nsjail reads 0 as "no limit".
    pub fn sandbox_seconds(&self) -> u64 {
        let time = self.time_limit.unwrap_or(Self::DEFAULT_TIME_LIMIT);
        (time.ceil() as u64).max(1)
    }

    /// Check that the limits can be enforced
    pub fn validate(&self) -> Result<(), String> {
        if let Some(time) = self.time_limit
            && !(time > 0.0 && time <= Self::MAX_TIME_LIMIT)
        {
            return Err(format!(
                "time_limit must be in (0, {}] seconds, got {time}",
                Self::MAX_TIME_LIMIT
            ));
        }
        if self.memory_limit == Some(0) {
            return Err("memory_limit must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            time_limit: Some(Self::DEFAULT_TIME_LIMIT),
            memory_limit: Some(Self::DEFAULT_MEMORY_LIMIT),
        }
    }
}

/// Configuration for a bind mount into the jail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Source path on the host
    pub source: String,

    /// Target path in the jail (defaults to the source path)
    #[serde(default)]
    pub target: Option<String>,

    /// Whether the mount is read-write (default: read-only)
    #[serde(default)]
    pub writable: bool,

    /// Whether this mount is optional (skipped if the source doesn't exist)
    #[serde(default)]
    pub optional: bool,
}

impl MountConfig {
    /// Read-only mount of a host path at the same location
    pub fn read_only(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: None,
            writable: false,
            optional: false,
        }
    }

    /// Mark the mount as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A single execution handed to the [`Runner`](crate::Runner).
///
/// The working directory must be owned by this execution alone; the caller
/// creates it before `execute` and removes it afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Source file, normally inside `work_dir`
    pub source_path: PathBuf,
    /// Data written to the program's stdin before it is closed
    pub input: Option<String>,
    pub language: Language,
    /// Directory bound read-write into the jail
    pub work_dir: PathBuf,
    /// Overrides applied on top of the configured default limits
    pub limits: Option<ResourceLimits>,
}

impl ExecutionRequest {
    pub fn new(
        source_path: impl Into<PathBuf>,
        language: Language,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            input: None,
            language,
            work_dir: work_dir.into(),
            limits: None,
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }
}

/// Result of an execution
///
/// Filled in once by the supervisor (or partially on internal failure) and
/// then finalized by the classifier, which only writes `message` while it is
/// still empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Standard output of the program
    pub stdout: String,

    /// Standard error of the program, without the telemetry line
    pub stderr: String,

    /// Exit code; `None` if the process never produced one
    pub exit_code: Option<i32>,

    /// Wall clock time reported by the timing wrapper, in seconds
    pub elapsed_seconds: Option<f64>,

    /// Peak resident memory reported by the timing wrapper, in megabytes
    pub memory_mb: Option<f64>,

    /// Whether the watchdog or the sandbox cut the program off
    pub timed_out: bool,

    /// Outcome message, see [`Outcome`]
    pub message: String,

    /// Reason for an internal failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Check if the execution was classified as a success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message == Outcome::Success.message()
    }

    /// Record an internal failure.
    ///
    /// The exit code is cleared and the message pre-populated so the
    /// classifier leaves it alone.
    pub fn fail(&mut self, reason: impl fmt::Display) {
        self.exit_code = None;
        self.error = Some(reason.to_string());
        self.message = Outcome::ServerError.message().to_owned();
    }
}

/// Final classification of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Exited with code 0
    Success,
    /// Exited with a non-zero code
    RuntimeError,
    /// Cut off by the watchdog or by the sandbox
    TimeLimitExceeded,
    /// The program never produced an exit code
    ServerError,
}

impl Outcome {
    /// User-facing message for this outcome
    pub fn message(self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::RuntimeError => "Runtime error",
            Outcome::TimeLimitExceeded => "Time limit exceeded",
            Outcome::ServerError => "Server error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn with_overrides_identity(
            time in proptest::option::of(0.0f64..1000.0),
            memory in proptest::option::of(0u64..10_000_000),
        ) {
            let base = ResourceLimits { time_limit: time, memory_limit: memory };
            let result = base.with_overrides(&ResourceLimits::none());
            prop_assert_eq!(result, base);
        }

        #[test]
        fn with_overrides_full_override(
            base_time in proptest::option::of(0.0f64..1000.0),
            override_time in 0.0f64..1000.0,
        ) {
            let base = ResourceLimits { time_limit: base_time, ..Default::default() };
            let overrides = ResourceLimits::none().with_time_limit(override_time);
            prop_assert_eq!(base.with_overrides(&overrides).time_limit, Some(override_time));
        }
    }
}
