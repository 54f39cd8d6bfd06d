//! Process supervision for jailed programs
//!
//! Spawns the composed command, feeds stdin, drains stdout/stderr and
//! enforces a wall-clock watchdog on top of the sandbox's own limits.

use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::jail::JailError;

/// Exit code reported when the program was killed with SIGKILL (128 + 9),
/// which is how nsjail enforces its time and memory ceilings
pub const SANDBOX_KILL_EXIT_CODE: i32 = 137;

/// Output of a process that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    /// Includes the telemetry line appended by the timing wrapper
    pub stderr: String,
    pub exit_code: i32,
}

/// How a supervised run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own
    Completed(RawOutput),
    /// The watchdog fired and the process group was killed.
    ///
    /// `partial` holds whatever output was collected if the killed process
    /// was reaped within the reap timeout.
    TimedOut { partial: Option<RawOutput> },
}

/// Wall-clock limits for one supervised run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchdog {
    /// How long the process may run before it is killed
    pub window: Duration,
    /// How long to wait for the killed process to be reaped
    pub reap_timeout: Duration,
}

impl Watchdog {
    pub fn new(window: Duration, reap_timeout: Duration) -> Self {
        Self {
            window,
            reap_timeout,
        }
    }

    /// Upper bound on how long [`run`] can take
    pub fn max_duration(&self) -> Duration {
        self.window + self.reap_timeout
    }
}

/// Run a command under the watchdog.
///
/// The wait happens on a separate task; the caller only waits up to the
/// watchdog deadline, then kills the whole process group and gives the task
/// `reap_timeout` to finish before abandoning it.
#[instrument(skip(argv, input), fields(program = argv.first().map(String::as_str)))]
pub async fn run(
    argv: &[String],
    input: Option<&str>,
    work_dir: &Path,
    watchdog: Watchdog,
) -> Result<RunOutcome, JailError> {
    let (program, args) = argv.split_first().ok_or(JailError::EmptyCommand)?;

    debug!(?argv, "spawning jail process");

    let child = Command::new(program)
        .args(args)
        .current_dir(work_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Own process group so the watchdog can kill the jail and everything under it
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
        .map_err(JailError::SpawnFailed)?;

    let pid = child.id();
    let deadline = Instant::now() + watchdog.window;
    let input = input.map(|data| data.as_bytes().to_vec());
    let mut worker = tokio::spawn(supervise(child, input));

    match tokio::time::timeout_at(deadline, &mut worker).await {
        Ok(joined) => {
            let output = joined??;
            debug!(exit_code = output.exit_code, "jail process exited");
            Ok(RunOutcome::Completed(output))
        }
        Err(_) => {
            warn!(?pid, window = ?watchdog.window, "watchdog expired, killing process group");
            kill_process_group(pid);

            let partial = match tokio::time::timeout(watchdog.reap_timeout, &mut worker).await {
                Ok(Ok(Ok(output))) => Some(output),
                Ok(Ok(Err(e))) => {
                    debug!(error = %e, "killed process failed while reaping");
                    None
                }
                Ok(Err(e)) => {
                    debug!(error = %e, "supervisor task failed while reaping");
                    None
                }
                Err(_) => {
                    warn!(?pid, "killed process was not reaped in time, abandoning it");
                    worker.abort();
                    None
                }
            };

            Ok(RunOutcome::TimedOut { partial })
        }
    }
}

/// Feed stdin, drain both output pipes and wait for exit, all concurrently
async fn supervise(mut child: Child, input: Option<Vec<u8>>) -> Result<RawOutput, JailError> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let feed = async move {
        let Some(mut stdin) = stdin else {
            return Ok(());
        };
        if let Some(data) = input {
            match stdin.write_all(&data).await {
                // The program exited or closed stdin without reading everything
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => return Err(JailError::Stdin(e)),
                Ok(()) => {}
            }
        }
        // Dropping stdin closes the pipe so reads in the program see EOF
        drop(stdin);
        Ok(())
    };

    let (fed, stdout, stderr, status) = tokio::join!(
        feed,
        read_pipe(stdout),
        read_pipe(stderr),
        child.wait()
    );

    fed?;
    let status = status?;

    Ok(RawOutput {
        stdout: stdout?,
        stderr: stderr?,
        exit_code: exit_code(status),
    })
}

async fn read_pipe<R>(pipe: Option<R>) -> Result<String, JailError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Normal exit returns the code, signal termination returns 128 + signal
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .unwrap_or_else(|| status.signal().map(|sig| 128 + sig).unwrap_or(1))
}

/// Kill the entire process group led by `pid` via `killpg(SIGKILL)`.
///
/// Requires the process to have been spawned with `process_group(0)` so that
/// its PGID equals its PID. No-op if the PID is unknown or cannot be
/// represented as `i32`.
pub fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid
        && let Ok(pid) = i32::try_from(pid)
    {
        let pgid = nix::unistd::Pid::from_raw(pid);
        if let Err(e) = nix::sys::signal::killpg(pgid, nix::sys::signal::Signal::SIGKILL) {
            debug!(pid, error = %e, "killpg failed");
        }
    }
}
