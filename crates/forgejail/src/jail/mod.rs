//! nsjail wrapper
//!
//! This module provides a Rust interface to nsjail and GNU time, handling
//! command building, process supervision and telemetry parsing.
//!
//! References for the flags used:
//! - https://github.com/google/nsjail
//! - https://www.gnu.org/software/time/

use std::path::Path;

use thiserror::Error;

pub use crate::jail::command::{
    IsolationBackend, NsjailBackend, NsjailCommand, TimeCommand, build_command,
};
pub use crate::jail::process::{
    RawOutput, RunOutcome, SANDBOX_KILL_EXIT_CODE, Watchdog, kill_process_group, run,
};
pub use crate::jail::usage::{ResourceUsage, UsageParseError, split_telemetry};
use crate::types::MountConfig;

mod command;
mod process;
mod usage;

/// Errors that occur while running a program in the jail.
///
/// Every variant is an internal failure: the runner records it in the
/// result instead of returning it.
#[derive(Debug, Error)]
pub enum JailError {
    #[error("empty command arguments")]
    EmptyCommand,

    #[error("failed to spawn jail process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("failed to write program input: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("supervisor task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("command '{0}' not found in PATH")]
    CommandNotFound(String),

    #[error("mount source path does not exist: {0}")]
    MountSourceNotFound(String),

    #[error("failed to parse resource usage: {0}")]
    Telemetry(#[from] UsageParseError),

    #[error("invalid limits: {0}")]
    InvalidLimits(String),
}

/// Validate that all mount source paths exist
///
/// Optional mounts (with `optional: true`) are skipped if the source doesn't exist.
pub fn validate_mounts(mounts: &[MountConfig]) -> Result<(), JailError> {
    for mount in mounts {
        if mount.optional {
            continue;
        }
        if !Path::new(&mount.source).exists() {
            return Err(JailError::MountSourceNotFound(mount.source.clone()));
        }
    }
    Ok(())
}

/// Resolve the program in a command to an absolute path using the host's PATH.
///
/// nsjail starts the program with `execve`, which does not search PATH, so
/// bare names like `python3` are resolved to `/usr/bin/python3` here.
/// Commands that already contain a `/` are left unchanged.
pub fn resolve_command(command: &mut [String]) -> Result<(), JailError> {
    let Some(first) = command.first_mut() else {
        return Ok(());
    };

    if first.contains('/') {
        return Ok(());
    }

    let path_var = std::env::var("PATH").unwrap_or_default();
    for dir in path_var.split(':').filter(|dir| !dir.is_empty()) {
        let candidate = Path::new(dir).join(&*first);
        if candidate.is_file() {
            // Canonicalize so the path stays valid across bind-mount boundaries
            *first = std::fs::canonicalize(&candidate)
                .unwrap_or(candidate)
                .to_string_lossy()
                .into_owned();
            return Ok(());
        }
    }

    Err(JailError::CommandNotFound(first.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_mounts_accepts_existing_sources() {
        let mounts = vec![MountConfig::read_only("/")];
        assert!(validate_mounts(&mounts).is_ok());
    }

    #[test]
    fn validate_mounts_rejects_missing_required_source() {
        let mounts = vec![MountConfig::read_only("/nonexistent/forgejail")];
        match validate_mounts(&mounts) {
            Err(JailError::MountSourceNotFound(path)) => assert_eq!(path, "/nonexistent/forgejail"),
            other => panic!("expected MountSourceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn validate_mounts_skips_missing_optional_source() {
        let mounts = vec![MountConfig::read_only("/nonexistent/forgejail").optional()];
        assert!(validate_mounts(&mounts).is_ok());
    }

    #[test]
    fn resolve_command_keeps_paths() {
        let mut cmd = vec!["/usr/bin/python3".to_string(), "main.py".to_string()];
        resolve_command(&mut cmd).unwrap();
        assert_eq!(cmd[0], "/usr/bin/python3");

        let mut relative = vec!["./main".to_string()];
        resolve_command(&mut relative).unwrap();
        assert_eq!(relative[0], "./main");
    }

    #[test]
    fn resolve_command_finds_sh() {
        let mut cmd = vec!["sh".to_string(), "-c".to_string(), "true".to_string()];
        resolve_command(&mut cmd).unwrap();
        assert!(cmd[0].starts_with('/'));
        assert_eq!(cmd[1], "-c");
    }

    #[test]
    fn resolve_command_unknown_program() {
        let mut cmd = vec!["forgejail-no-such-binary".to_string()];
        assert!(matches!(
            resolve_command(&mut cmd),
            Err(JailError::CommandNotFound(name)) if name == "forgejail-no-such-binary"
        ));
    }

    #[test]
    fn resolve_command_empty_is_noop() {
        let mut cmd: Vec<String> = Vec::new();
        assert!(resolve_command(&mut cmd).is_ok());
    }
}
