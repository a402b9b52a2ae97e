//! Spawning and supervising the child.
//!
//! A run is one task: waiting on the child, feeding stdin and draining
//! both output pipes are joined futures, not spawned tasks. The child is
//! created with `kill_on_drop`, so dropping a run future mid-flight does
//! not leak the process.
//!
//! Pipe I/O ends at EOF or `output_drain` after the outcome is known,
//! whichever comes first. A grandchild that inherited a pipe therefore
//! cannot keep the run from resolving.

use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::io;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::options::{ProcessOptions, Stdin};
use crate::outcome::{CancelReason, ExitState, ProcessOutcome, ProcessResult, Termination};

const READ_CHUNK: usize = 8 * 1024;

/// Builder-style handle for one supervised run.
#[derive(Debug, Clone)]
pub struct SupervisedProcess {
    program: OsString,
    args: Vec<OsString>,
    options: ProcessOptions,
}

impl SupervisedProcess {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            options: ProcessOptions::default(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn options(mut self, options: ProcessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Spawn the process and wait for its single outcome.
    pub async fn run(self) -> ProcessResult {
        run(self.program, self.args, self.options).await
    }
}

/// Captured bytes from one output pipe.
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Spawn `program` with `args` and supervise it to a single outcome.
///
/// Never fails: spawn errors, signals and cancellation are all reported
/// in [`ProcessResult::outcome`].
pub async fn run<S, I, A>(program: S, args: I, options: ProcessOptions) -> ProcessResult
where
    S: AsRef<OsStr>,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let start = Instant::now();
    let program = program.as_ref();
    let display_name = program.to_string_lossy().into_owned();

    let ProcessOptions {
        stdin,
        stdout,
        stderr,
        cwd,
        env,
        env_clear,
        timeout,
        kill_grace,
        max_output_bytes,
        output_drain,
        cancel,
    } = options;

    let finished = |outcome, pid, out: Option<Captured>, err: Option<Captured>| {
        let (stdout, stdout_truncated) = split_capture(out);
        let (stderr, stderr_truncated) = split_capture(err);
        ProcessResult {
            program: display_name.clone(),
            outcome,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
            pid,
            duration: start.elapsed(),
        }
    };

    let cancel = cancel.unwrap_or_default();
    if cancel.is_cancelled() {
        debug!(program = %display_name, "cancelled before spawn");
        let outcome = ProcessOutcome::Cancelled {
            reason: CancelReason::Requested,
            termination: None,
        };
        return finished(outcome, None, None, None);
    }

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(stdin.stdio())
        .stdout(stdout.stdio())
        .stderr(stderr.stdio())
        .kill_on_drop(true);
    if let Some(cwd) = &cwd {
        cmd.current_dir(cwd);
    }
    if env_clear {
        cmd.env_clear();
    }
    cmd.envs(&env);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %display_name, error = %e, "failed to spawn process");
            let outcome = ProcessOutcome::SpawnFailed {
                cause: e.to_string(),
            };
            return finished(outcome, None, None, None);
        }
    };

    let pid = child.id();
    info!(program = %display_name, pid, "process started");

    let input = match stdin {
        Stdin::Bytes(bytes) => Some(bytes),
        Stdin::Inherit | Stdin::Null => None,
    };
    let stdin_pipe = child.stdin.take();
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let exited = CancellationToken::new();
    let supervised = async {
        let outcome = supervise(&mut child, &cancel, timeout, kill_grace).await;
        exited.cancel();
        outcome
    };

    let (outcome, (), out, err) = tokio::join!(
        supervised,
        feed_stdin(stdin_pipe, input, drain_window(&exited, output_drain)),
        capture(
            stdout_pipe,
            max_output_bytes,
            "stdout",
            drain_window(&exited, output_drain)
        ),
        capture(
            stderr_pipe,
            max_output_bytes,
            "stderr",
            drain_window(&exited, output_drain)
        ),
    );

    info!(
        program = %display_name,
        pid,
        outcome = %outcome,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "process finished"
    );
    finished(outcome, pid, out, err)
}

/// Resolves `window` after `exited` fires.
async fn drain_window(exited: &CancellationToken, window: Duration) {
    exited.cancelled().await;
    tokio::time::sleep(window).await;
}

fn split_capture(captured: Option<Captured>) -> (Option<Vec<u8>>, bool) {
    match captured {
        Some(c) => (Some(c.bytes), c.truncated),
        None => (None, false),
    }
}

/// Wait for the child, racing its exit against cancellation and timeout.
async fn supervise(
    child: &mut Child,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
    kill_grace: Duration,
) -> ProcessOutcome {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    // Exit is polled first so a child that has already exited wins over a
    // cancellation observed in the same poll.
    let reason = tokio::select! {
        biased;
        status = child.wait() => {
            return match status {
                Ok(status) => ProcessOutcome::from_status(status),
                Err(e) => ProcessOutcome::WaitFailed { cause: e.to_string() },
            };
        }
        _ = cancel.cancelled() => CancelReason::Requested,
        _ = deadline => CancelReason::Timeout,
    };

    // The exit may have landed after the last poll of `wait`.
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(reason = %reason, "process exited before cancellation took effect");
            return ProcessOutcome::from_status(status);
        }
        Ok(None) => {}
        Err(e) => return ProcessOutcome::WaitFailed { cause: e.to_string() },
    }

    debug!(pid = child.id(), reason = %reason, "cancelling process");
    match terminate(child, kill_grace).await {
        Ok(termination) => ProcessOutcome::Cancelled {
            reason,
            termination: Some(termination),
        },
        Err(e) => ProcessOutcome::WaitFailed { cause: e.to_string() },
    }
}

/// Ask the child to stop, force-kill after `grace`, and report how it
/// actually ended.
async fn terminate(child: &mut Child, grace: Duration) -> io::Result<Termination> {
    if !grace.is_zero() && request_stop(child) {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                return Ok(Termination {
                    state: ExitState::from_status(status?),
                    escalated: false,
                });
            }
            Err(_) => {
                warn!(
                    pid = child.id(),
                    grace_ms = grace.as_millis() as u64,
                    "process ignored termination request, killing"
                );
            }
        }
    }

    child.start_kill()?;
    let status = child.wait().await?;
    Ok(Termination {
        state: ExitState::from_status(status),
        escalated: true,
    })
}

/// Send SIGTERM. Returns false when no graceful request could be made.
#[cfg(unix)]
fn request_stop(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return false;
    };
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            debug!(pid, error = %e, "failed to send SIGTERM");
            false
        }
    }
}

#[cfg(not(unix))]
fn request_stop(_child: &Child) -> bool {
    false
}

async fn feed_stdin<D>(pipe: Option<ChildStdin>, input: Option<Vec<u8>>, deadline: D)
where
    D: Future<Output = ()>,
{
    let (Some(mut pipe), Some(input)) = (pipe, input) else {
        return;
    };

    let written = tokio::select! {
        written = pipe.write_all(&input) => written,
        _ = deadline => {
            debug!("stdin still blocked after the child finished, closing it");
            return;
        }
    };

    if let Err(e) = written {
        // The child may exit without reading its input.
        if e.kind() == io::ErrorKind::BrokenPipe {
            debug!("child closed stdin before all input was written");
        } else {
            warn!(error = %e, "failed to write child stdin");
        }
    }
    // Dropping the pipe closes it, signalling EOF.
}

/// Drain a pipe until EOF or `deadline`, keeping at most `limit` bytes.
async fn capture<R, D>(
    pipe: Option<R>,
    limit: usize,
    stream: &'static str,
    deadline: D,
) -> Option<Captured>
where
    R: AsyncRead + Unpin,
    D: Future<Output = ()>,
{
    let mut pipe = pipe?;
    let mut captured = Captured::default();
    let mut buf = vec![0u8; READ_CHUNK];
    tokio::pin!(deadline);

    loop {
        // Deadline first: a pipe that never goes quiet must not starve it.
        let read = tokio::select! {
            biased;
            _ = &mut deadline => {
                debug!(stream, "pipe still open after the drain window, giving up");
                captured.truncated = true;
                break;
            }
            read = pipe.read(&mut buf) => read,
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                let room = limit.saturating_sub(captured.bytes.len());
                if n > room {
                    if !captured.truncated {
                        debug!(stream, limit, "output limit reached, discarding the rest");
                    }
                    captured.truncated = true;
                }
                captured.bytes.extend_from_slice(&buf[..n.min(room)]);
            }
            Err(e) => {
                warn!(stream, error = %e, "error reading child output");
                break;
            }
        }
    }

    Some(captured)
}
