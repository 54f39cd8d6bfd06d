//! Code runner for Forgejail
//!
//! Provides the high-level API the service layer calls for each request.

use std::sync::Arc;

pub use crate::runner::classify::{classify, finalize};
pub use crate::runner::execute::execute;

mod classify;
mod execute;

use crate::{
    config::{Config, ConfigError},
    jail::{IsolationBackend, NsjailBackend},
    types::{ExecutionRequest, ExecutionResult},
};

/// High-level runner for code execution
#[derive(Debug, Clone)]
pub struct Runner {
    config: Config,
    backend: Arc<dyn IsolationBackend>,
}

impl Runner {
    /// Create a new runner that isolates programs with nsjail
    pub fn new(config: Config) -> Self {
        let backend = Arc::new(NsjailBackend::from_config(&config));
        Self { config, backend }
    }

    /// Create a new runner with default configuration
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Create a runner with a different isolation backend
    pub fn with_backend(config: Config, backend: Arc<dyn IsolationBackend>) -> Self {
        Self { config, backend }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a source file and classify the result
    ///
    /// Every runtime failure is reported inside the returned result; `Err` means
    /// the language has no interpreter configured for this platform.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ConfigError> {
        execute::execute(&self.config, self.backend.as_ref(), request).await
    }
}
