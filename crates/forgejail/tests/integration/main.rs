//! Integration tests for forgejail
//!
//! Execution tests require nsjail, GNU time, python3 and node on the host.
//! Run with: cargo test -p forgejail --features integration-tests
//!
//! Tests that need the real jail are marked `#[ignore]`. To include them:
//!    cargo test -p forgejail --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use std::path::Path;

use forgejail::{ExecutionRequest, Language};
use tempfile::TempDir;

mod config_loading;
mod execution;

/// Write `source` as the language's entry file in a fresh working directory
pub(crate) fn materialize(language: Language, source: &str) -> (TempDir, ExecutionRequest) {
    let dir = tempfile::Builder::new()
        .prefix("forgejail_")
        .tempdir()
        .expect("failed to create working directory");
    let source_path = dir.path().join(language.source_name());
    std::fs::write(&source_path, source).expect("failed to write source");
    let request = ExecutionRequest::new(source_path, language, dir.path());
    (dir, request)
}

/// Write a config file with a `.toml` extension so the loader can infer the format
pub(crate) fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("forgejail.toml");
    std::fs::write(&path, content).expect("failed to write config");
    path
}
