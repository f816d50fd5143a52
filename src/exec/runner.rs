// src/exec/runner.rs

//! Single external process lifecycle.
//!
//! [`run_process`] starts one command and waits for whichever comes first:
//! natural exit, the optional timeout, or the caller's cancellation future.
//! Exactly one of them decides the [`RunOutcome`]; on timeout or cancellation
//! the child's process group is killed and the child reaped before the
//! function returns.

use std::fmt;
use std::future::Future;
use std::io::IsTerminal;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::logging::{OutputSink, OutputStream};

/// How long to keep draining output pipes after the process is gone.
///
/// A grandchild that inherited a pipe can keep it open after the direct
/// child was killed; output readers are abandoned after this grace period.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// What to do with the process's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutMode {
    Discard,
    Capture(OutputStream),
}

/// Everything needed to launch one process.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdout: StdoutMode,
    /// Pass this process's stdin through to the child.
    pub inherit_stdin: bool,
    pub timeout: Option<Duration>,
    /// Label used in logs and as the sink origin, e.g. `"backup: Job"`.
    pub origin: String,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, origin: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stdout: StdoutMode::Discard,
            inherit_stdin: true,
            timeout: None,
            origin: origin.into(),
        }
    }

    pub fn with_stdout(mut self, stdout: StdoutMode) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_inherit_stdin(mut self, inherit: bool) -> Self {
        self.inherit_stdin = inherit;
        self
    }

    /// Command line for logs and dry runs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Why a running process was cancelled from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// SIGINT / SIGTERM received by this program.
    UserInterrupt,
    /// A parallel pre-operation failed and asked the job to stop.
    OperationFailed,
}

/// Why a process did not succeed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessFailure {
    /// Could not be started (or waited on).
    Launch(String),
    /// Exited unsuccessfully. `code` is `None` when killed by a signal.
    Exit { code: Option<i32>, stderr: String },
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessFailure::Launch(msg) => write!(f, "{msg}"),
            ProcessFailure::Exit { code, stderr } => {
                match code {
                    Some(code) => write!(f, "exit status {code}")?,
                    None => write!(f, "terminated by signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
        }
    }
}

/// Result of one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(ProcessFailure),
    TimedOut(Duration),
    Interrupted(CancelReason),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

/// Launch `spec` and wait for natural exit, timeout or `cancel`.
///
/// `cancel` is polled alongside the process; when it resolves first the
/// process is killed and `Interrupted(reason)` is returned. Pass
/// [`std::future::pending`] for an uncancellable run.
pub async fn run_process<C>(spec: &ProcessSpec, sink: &Arc<dyn OutputSink>, cancel: C) -> RunOutcome
where
    C: Future<Output = CancelReason>,
{
    info!(origin = %spec.origin, cmd = %spec.command_line(), "starting process");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(if spec.inherit_stdin {
            Stdio::inherit()
        } else {
            Stdio::null()
        })
        .stdout(match spec.stdout {
            StdoutMode::Discard => Stdio::null(),
            StdoutMode::Capture(_) => Stdio::piped(),
        })
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // A child reading from the controlling terminal must stay in the
    // foreground group; the terminal's own SIGINT reaches its tree there.
    let own_group = !(spec.inherit_stdin && std::io::stdin().is_terminal());
    #[cfg(unix)]
    if own_group {
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(origin = %spec.origin, program = %spec.program, error = %e, "failed to start process");
            return RunOutcome::Failed(ProcessFailure::Launch(format!(
                "unable to start '{}': {e}",
                spec.program
            )));
        }
    };

    let stdout_task = match (spec.stdout, child.stdout.take()) {
        (StdoutMode::Capture(stream), Some(stdout)) => Some(spawn_line_forwarder(
            stdout,
            Arc::clone(sink),
            stream,
            spec.origin.clone(),
        )),
        _ => None,
    };
    let stderr_task = child
        .stderr
        .take()
        .map(|stderr| spawn_stderr_collector(stderr, spec.origin.clone()));

    let deadline = async {
        match spec.timeout {
            Some(after) => {
                sleep(after).await;
                after
            }
            None => std::future::pending().await,
        }
    };

    let outcome = tokio::select! {
        status_res = child.wait() => {
            match status_res {
                Ok(status) if status.success() => {
                    info!(origin = %spec.origin, exit_code = status.code().unwrap_or(0), "process exited");
                    RunOutcome::Success
                }
                Ok(status) => {
                    info!(origin = %spec.origin, exit_code = ?status.code(), success = false, "process exited");
                    RunOutcome::Failed(ProcessFailure::Exit { code: status.code(), stderr: String::new() })
                }
                Err(e) => RunOutcome::Failed(ProcessFailure::Launch(format!(
                    "waiting for '{}': {e}",
                    spec.program
                ))),
            }
        }

        after = deadline => {
            warn!(origin = %spec.origin, timeout_secs = after.as_secs(), "timeout reached; killing process");
            terminate(&mut child, own_group, &spec.origin).await;
            RunOutcome::TimedOut(after)
        }

        reason = cancel => {
            info!(origin = %spec.origin, ?reason, "cancellation requested; killing process");
            terminate(&mut child, own_group, &spec.origin).await;
            RunOutcome::Interrupted(reason)
        }
    };

    if let Some(task) = stdout_task {
        drain(task, &spec.origin, "stdout").await;
    }
    let stderr = match stderr_task {
        Some(task) => drain(task, &spec.origin, "stderr").await.unwrap_or_default(),
        None => String::new(),
    };

    match outcome {
        RunOutcome::Failed(ProcessFailure::Exit { code, .. }) => {
            RunOutcome::Failed(ProcessFailure::Exit {
                code,
                stderr: stderr.trim_end().to_string(),
            })
        }
        other => other,
    }
}

/// Kill the child's process group (when it leads one), then the child, and
/// reap it.
async fn terminate(child: &mut Child, own_group: bool, origin: &str) {
    if own_group && let Some(pid) = child.id() {
        kill_group(pid, origin);
    }
    if let Err(e) = child.kill().await {
        warn!(origin = %origin, error = %e, "failed to kill child process");
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32, origin: &str) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created by our spawn.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        debug!(origin = %origin, pgid, error = %err, "failed to signal process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32, _origin: &str) {}

async fn drain<T>(task: JoinHandle<T>, origin: &str, pipe: &str) -> Option<T> {
    match timeout(OUTPUT_DRAIN_GRACE, task).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(origin = %origin, pipe, error = %e, "output reader task failed");
            None
        }
        Err(_) => {
            debug!(origin = %origin, pipe, "output pipe still open after process exit; abandoning reader");
            None
        }
    }
}

fn spawn_line_forwarder<R>(
    reader: R,
    sink: Arc<dyn OutputSink>,
    stream: OutputStream,
    origin: String,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            sink.write_line(stream, &origin, &line);
        }
        debug!(origin = %origin, %stream, "stdout forwarder ended");
    })
}

fn spawn_stderr_collector<R>(reader: R, origin: String) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut collected = String::new();
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(origin = %origin, "stderr: {}", line);
            collected.push_str(&line);
            collected.push('\n');
        }
        collected
    })
}
