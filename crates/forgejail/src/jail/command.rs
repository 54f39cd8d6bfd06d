//! Command builders for nsjail and GNU time
//!
//! The final argument vector is always
//! `<isolation flags> <timing flags> <interpreter> <source>`, so the timing
//! wrapper measures the whole jailed invocation and its telemetry line lands
//! on the program's stderr.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{Config, Interpreter, SandboxConfig};
use crate::jail::{JailError, resolve_command, validate_mounts};
use crate::types::{MountConfig, ResourceLimits};

/// An enforcement mechanism that runs a program under resource limits.
///
/// Implementations only shape the argument vector; spawning and supervision
/// stay with the supervisor.
pub trait IsolationBackend: fmt::Debug + Send + Sync {
    /// Wrap `program` so it runs confined to `work_dir` under `limits`
    fn wrap(&self, work_dir: &Path, limits: &ResourceLimits, program: Vec<String>) -> Vec<String>;

    /// Check host prerequisites before a run
    fn validate(&self) -> Result<(), JailError> {
        Ok(())
    }
}

/// Builder for nsjail command-line arguments
#[derive(Debug, Clone)]
pub struct NsjailCommand {
    /// Path to nsjail binary
    nsjail_path: PathBuf,
    /// --user
    user: u32,
    /// --group
    group: u32,
    /// --rlimit_as and --time_limit
    limits: ResourceLimits,
    /// -R / -B
    mounts: Vec<MountConfig>,
    /// -B and -D
    work_dir: Option<PathBuf>,
    /// --keep_env
    keep_env: bool,
    /// -q
    quiet: bool,
    command: Vec<String>,
}

impl NsjailCommand {
    /// Create a new nsjail command builder
    pub fn new(nsjail_path: impl Into<PathBuf>) -> Self {
        Self {
            nsjail_path: nsjail_path.into(),
            user: 99999,
            group: 99999,
            limits: ResourceLimits::none(),
            mounts: Vec::new(),
            work_dir: None,
            keep_env: false,
            quiet: false,
            command: Vec::new(),
        }
    }

    /// Set the unprivileged user and group the program runs as
    pub fn identity(mut self, user: u32, group: u32) -> Self {
        self.user = user;
        self.group = group;
        self
    }

    /// Set resource limits
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Add a bind mount
    pub fn mount(mut self, mount: MountConfig) -> Self {
        self.mounts.push(mount);
        self
    }

    /// Add multiple bind mounts
    pub fn mounts(mut self, mounts: impl IntoIterator<Item = MountConfig>) -> Self {
        self.mounts.extend(mounts);
        self
    }

    /// Bind the working directory read-write and start the program in it
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Pass the caller's environment through
    pub fn keep_env(mut self, enable: bool) -> Self {
        self.keep_env = enable;
        self
    }

    /// Silence nsjail's own log output
    pub fn quiet(mut self, enable: bool) -> Self {
        self.quiet = enable;
        self
    }

    /// Set the command to run
    pub fn command(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Build the command-line arguments
    ///
    /// Consumes self to avoid cloning the command vector.
    pub fn build(self) -> Vec<String> {
        let mut args = vec![self.nsjail_path.to_string_lossy().into_owned()];

        // Run once, in the foreground
        args.push("-Mo".to_string());
        if self.quiet {
            args.push("-q".to_string());
        }

        args.push("--user".to_string());
        args.push(self.user.to_string());
        args.push("--group".to_string());
        args.push(self.group.to_string());

        // Resource limits
        if let Some(memory) = self.limits.memory_limit {
            // nsjail takes the address-space limit in megabytes
            let mb = memory.div_ceil(ResourceLimits::MB);
            args.push(format!("--rlimit_as={mb}"));
        }
        if self.limits.time_limit.is_some() {
            args.push(format!("--time_limit={}", self.limits.sandbox_seconds()));
        }

        // Mounts
        for mount in &self.mounts {
            // Skip optional mounts whose source doesn't exist
            if mount.optional && !Path::new(&mount.source).exists() {
                continue;
            }
            args.push(if mount.writable { "-B" } else { "-R" }.to_string());
            match mount.target {
                Some(ref target) if *target != mount.source => {
                    args.push(format!("{}:{}", mount.source, target));
                }
                _ => args.push(mount.source.clone()),
            }
        }

        // Working directory
        if let Some(ref dir) = self.work_dir {
            let dir = dir.to_string_lossy().into_owned();
            args.push("-B".to_string());
            args.push(dir.clone());
            args.push("-D".to_string());
            args.push(dir);
        }

        if self.keep_env {
            args.push("--keep_env".to_string());
        }

        // Separator and command
        args.push("--".to_string());
        args.extend(self.command);

        args
    }
}

/// Builder for the GNU time wrapper
#[derive(Debug, Clone)]
pub struct TimeCommand {
    time_path: PathBuf,
}

impl TimeCommand {
    /// Elapsed wall clock time and peak resident set size in kilobytes
    pub const FORMAT: &'static str = "%E %M";

    pub fn new(time_path: impl Into<PathBuf>) -> Self {
        Self {
            time_path: time_path.into(),
        }
    }

    /// Prefix `program` with the timing wrapper
    pub fn wrap(&self, program: Vec<String>) -> Vec<String> {
        let mut args = vec![
            self.time_path.to_string_lossy().into_owned(),
            "-a".to_string(),
            "-f".to_string(),
            Self::FORMAT.to_string(),
            "--".to_string(),
        ];
        args.extend(program);
        args
    }
}

/// nsjail as an [`IsolationBackend`]
#[derive(Debug, Clone)]
pub struct NsjailBackend {
    nsjail_path: PathBuf,
    sandbox: SandboxConfig,
}

impl NsjailBackend {
    pub fn new(nsjail_path: impl Into<PathBuf>, sandbox: SandboxConfig) -> Self {
        Self {
            nsjail_path: nsjail_path.into(),
            sandbox,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.nsjail_path.clone(), config.sandbox.clone())
    }
}

impl IsolationBackend for NsjailBackend {
    fn wrap(&self, work_dir: &Path, limits: &ResourceLimits, program: Vec<String>) -> Vec<String> {
        NsjailCommand::new(&self.nsjail_path)
            .quiet(self.sandbox.quiet)
            .identity(self.sandbox.user, self.sandbox.group)
            .limits(limits.clone())
            .mounts(self.sandbox.mounts.iter().cloned())
            .work_dir(work_dir)
            .keep_env(self.sandbox.keep_env)
            .command(program)
            .build()
    }

    fn validate(&self) -> Result<(), JailError> {
        validate_mounts(&self.sandbox.mounts)
    }
}

/// Compose the full argument vector for one execution.
///
/// Bare interpreter and time binary names are resolved against the host PATH
/// first, since nothing inside the jail searches PATH for them.
pub fn build_command(
    backend: &dyn IsolationBackend,
    timer: &TimeCommand,
    interpreter: &Interpreter,
    source: &Path,
    work_dir: &Path,
    limits: &ResourceLimits,
) -> Result<Vec<String>, JailError> {
    let mut program = interpreter.invocation(&source.to_string_lossy());
    resolve_command(&mut program)?;

    let mut timed = timer.wrap(program);
    resolve_command(&mut timed)?;

    Ok(backend.wrap(work_dir, limits, timed))
}
