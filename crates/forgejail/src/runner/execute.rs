//! Execution of one request
//!
//! Builds the jailed command, supervises it and folds every failure mode
//! into an [`ExecutionResult`]. Only configuration errors escape.

use tracing::{debug, instrument, warn};

use crate::config::{Config, ConfigError, Interpreter};
use crate::jail::{
    IsolationBackend, JailError, RawOutput, RunOutcome, SANDBOX_KILL_EXIT_CODE, TimeCommand,
    Watchdog, build_command, run, split_telemetry,
};
use crate::runner::classify::finalize;
use crate::types::{ExecutionRequest, ExecutionResult, ResourceLimits};

/// Execute a source file in the jail
///
/// Returns `Err` only when no interpreter is configured for the request's
/// language on this platform.
#[instrument(
    skip(config, backend, request),
    fields(language = %request.language, work_dir = %request.work_dir.display())
)]
pub async fn execute(
    config: &Config,
    backend: &dyn IsolationBackend,
    request: &ExecutionRequest,
) -> Result<ExecutionResult, ConfigError> {
    let limits = config.effective_limits(request.limits.as_ref());
    let interpreter = config.interpreter(request.language)?;

    let mut result = ExecutionResult::default();
    match supervise(config, backend, interpreter, request, &limits).await {
        Ok(RunOutcome::Completed(output)) => record_completion(&mut result, output),
        Ok(RunOutcome::TimedOut { partial }) => {
            result.timed_out = true;
            if let Some(output) = partial {
                result.stdout = output.stdout;
                result.stderr = output.stderr;
            }
        }
        Err(e) => {
            warn!(error = %e, "execution failed internally");
            result.fail(e);
        }
    }

    finalize(&mut result);

    debug!(
        message = %result.message,
        exit_code = ?result.exit_code,
        elapsed = ?result.elapsed_seconds,
        memory_mb = ?result.memory_mb,
        timed_out = result.timed_out,
        "execution complete"
    );

    Ok(result)
}

async fn supervise(
    config: &Config,
    backend: &dyn IsolationBackend,
    interpreter: &Interpreter,
    request: &ExecutionRequest,
    limits: &ResourceLimits,
) -> Result<RunOutcome, JailError> {
    limits.validate().map_err(JailError::InvalidLimits)?;
    backend.validate()?;

    let timer = TimeCommand::new(&config.time_path);
    let argv = build_command(
        backend,
        &timer,
        interpreter,
        &request.source_path,
        &request.work_dir,
        limits,
    )?;

    // Derived from the same whole seconds nsjail receives, so the watchdog
    // never fires before the sandbox's own limit
    let watchdog = Watchdog::new(
        config
            .watchdog
            .window(limits.sandbox_seconds())
            .map_err(JailError::InvalidLimits)?,
        config
            .watchdog
            .reap_timeout()
            .map_err(JailError::InvalidLimits)?,
    );

    run(&argv, request.input.as_deref(), &request.work_dir, watchdog).await
}

fn record_completion(result: &mut ExecutionResult, output: RawOutput) {
    // nsjail SIGKILLs the program when it hits a ceiling
    let killed = output.exit_code == SANDBOX_KILL_EXIT_CODE;
    result.stdout = output.stdout;

    match split_telemetry(&output.stderr) {
        Ok((stderr, usage)) => {
            result.stderr = stderr;
            result.exit_code = Some(output.exit_code);
            result.elapsed_seconds = Some(usage.elapsed_seconds());
            result.memory_mb = Some(usage.memory_mb());
            result.timed_out = killed;
        }
        // The timing wrapper died with the program, so there is nothing to parse
        Err(_) if killed => {
            result.stderr = output.stderr;
            result.exit_code = Some(output.exit_code);
            result.timed_out = true;
        }
        Err(e) => {
            warn!(error = %e, exit_code = output.exit_code, "missing resource usage");
            result.stderr = output.stderr;
            result.fail(JailError::Telemetry(e));
        }
    }
}
