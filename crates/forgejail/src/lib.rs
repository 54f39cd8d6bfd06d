//! A library for sandboxed code execution.
//!
//! Forgejail runs untrusted Python and JavaScript source files inside nsjail,
//! measures them with GNU time and reports a classified result. Every
//! runtime failure is folded into the returned [`ExecutionResult`]; only an
//! unmapped platform or language is reported as an error.
//!
//! # Features
//!
//! - **nsjail isolation**: unprivileged identity, read-only system mounts and address-space and CPU time ceilings.
//! - **Watchdog**: wall-clock kill of the whole process group, independent of nsjail's own limit.
//! - **Telemetry**: elapsed time and peak memory parsed from the timing wrapper's output.
//! - **TOML configuration**: interpreter table per platform and language, sandbox and limit defaults.

pub use config::{
    Config, ConfigError, EXAMPLE_CONFIG, Interpreter, InterpreterTable, Language, Platform,
    SandboxConfig, WatchdogConfig,
};
pub use jail::{
    IsolationBackend, JailError, NsjailBackend, NsjailCommand, ResourceUsage, TimeCommand,
    UsageParseError,
};
pub use runner::Runner;
pub use types::{ExecutionRequest, ExecutionResult, MountConfig, Outcome, ResourceLimits};

pub mod config;
pub mod jail;
pub mod runner;
pub mod types;
