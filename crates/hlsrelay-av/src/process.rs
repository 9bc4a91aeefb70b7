//! Supervised engine process.
//!
//! [`EngineProcess::spawn`] launches the engine and hands the child to a
//! reaper task that owns it for its whole life. The reaper:
//!
//! 1. Reports [`EngineEvent::Launched`] once the child is running.
//! 2. Reads stderr, forwarding progress as [`EngineEvent::Progress`] and
//!    keeping the last diagnostic lines for failure classification.
//! 3. Applies termination requests from the owning [`EngineProcess`],
//!    including the forced kill that follows an unanswered graceful stop.
//! 4. Reaps the child and reports [`EngineEvent::Exited`].
//!
//! Termination requests travel over a channel private to one child, so a
//! late forced kill can never reach a different process. Escalation is timed
//! by the reaper itself, so it still happens if whoever asked for the stop
//! stops waiting.

use std::collections::VecDeque;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hlsrelay_core::failure::{self, FailureReason};
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::sync::{mpsc, watch};

use crate::command::EngineCommand;
use crate::progress::Progress;

/// Number of stderr lines retained for classification.
const DIAGNOSTIC_LINES: usize = 32;

/// Minimum spacing between progress log lines.
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// How long to keep reading stderr after the child was reaped. A grandchild
/// may hold the pipe open.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Lifecycle notification from a running engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Launched { pid: Option<u32> },
    Progress(Progress),
    Exited(ExitReport),
}

/// How an engine run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    /// The exit followed a forced kill issued by the owner.
    pub forced: bool,
    /// Tail of non-progress stderr output, oldest first.
    pub diagnostics: Vec<String>,
}

impl ExitReport {
    fn new(status: std::io::Result<ExitStatus>, forced: bool, mut diagnostics: Vec<String>) -> Self {
        match status {
            Ok(status) => Self {
                code: status.code(),
                signal: exit_signal(&status),
                forced,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(format!("failed to wait for engine: {e}"));
                Self {
                    code: None,
                    signal: None,
                    forced,
                    diagnostics,
                }
            }
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn classify(&self) -> FailureReason {
        failure::classify(self.code, self.signal, &self.diagnostics)
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[derive(Debug, Clone, Copy)]
enum Control {
    /// Terminate, then kill if still running after the grace period.
    Stop { grace: Duration },
}

/// Owner's handle to a running engine.
///
/// Dropping the handle without stopping the engine kills it.
#[derive(Debug)]
pub struct EngineProcess {
    pid: Option<u32>,
    control: mpsc::Sender<Control>,
    exit: watch::Receiver<Option<ExitReport>>,
}

impl EngineProcess {
    /// Launch the engine and start supervising it.
    ///
    /// Lifecycle events for this child are delivered on `events` in order;
    /// [`EngineEvent::Exited`] is always the last one.
    ///
    /// # Errors
    ///
    /// Returns [`hlsrelay_core::Error::LaunchFailed`] if the process cannot be
    /// created. Failures after creation are reported through `events`.
    pub fn spawn(
        command: &EngineCommand,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> hlsrelay_core::Result<Self> {
        let program = command.program_name();
        let mut child = command.to_command().spawn().map_err(|e| {
            hlsrelay_core::Error::launch_failed(&program, format!("failed to spawn: {e}"))
        })?;

        let pid = child.id();
        let stderr = child.stderr.take();
        let (control_tx, control_rx) = mpsc::channel(4);
        let (exit_tx, exit_rx) = watch::channel(None);

        tracing::debug!(tool = %program, pid = ?pid, "Engine spawned");
        tokio::spawn(supervise(child, stderr, control_rx, exit_tx, events, program));

        Ok(Self {
            pid,
            control: control_tx,
            exit: exit_rx,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The exit report, if the engine has already been reaped.
    pub fn exit_report(&self) -> Option<ExitReport> {
        self.exit.borrow().clone()
    }

    /// Wait up to `timeout` for the engine to be reaped.
    pub async fn wait_exit(&self, timeout: Duration) -> Option<ExitReport> {
        let mut rx = self.exit.clone();
        let waited = tokio::time::timeout(timeout, async {
            // An error means the reaper is gone; the last value still stands.
            let _ = rx.wait_for(Option::is_some).await;
        })
        .await;
        match waited {
            Ok(()) => rx.borrow().clone(),
            Err(_elapsed) => None,
        }
    }

    /// Ask the reaper to terminate gracefully and force a kill if the engine
    /// is still running after `grace`. Does not wait.
    ///
    /// The escalation runs in the reaper, so it completes even if nobody
    /// waits for the exit.
    pub fn begin_shutdown(&self, grace: Duration) {
        let _ = self.control.try_send(Control::Stop { grace });
    }

    /// [`begin_shutdown`](Self::begin_shutdown) and wait for the engine to
    /// be reaped.
    ///
    /// Returns `None` only if the engine could not be reaped within
    /// `kill_timeout` of the forced kill.
    pub async fn shutdown(&self, grace: Duration, kill_timeout: Duration) -> Option<ExitReport> {
        if let Some(report) = self.exit_report() {
            return Some(report);
        }

        self.begin_shutdown(grace);
        let report = self.wait_exit(grace + kill_timeout).await;
        if report.is_none() {
            tracing::error!(pid = ?self.pid, "Engine not reaped after forced kill");
        }
        report
    }
}

/// Reaper task: owns the child until it exits.
async fn supervise(
    mut child: Child,
    stderr: Option<ChildStderr>,
    mut control: mpsc::Receiver<Control>,
    exit_tx: watch::Sender<Option<ExitReport>>,
    events: mpsc::UnboundedSender<EngineEvent>,
    program: String,
) {
    let _ = events.send(EngineEvent::Launched { pid: child.id() });

    let tail = Arc::new(Mutex::new(VecDeque::with_capacity(DIAGNOSTIC_LINES)));
    let mut reader = stderr.map(|s| {
        tokio::spawn(read_stderr(s, Arc::clone(&tail), events.clone(), program.clone()))
    });

    let mut forced = false;
    let mut control_open = true;
    let mut kill_at: Option<tokio::time::Instant> = None;
    let status = loop {
        tokio::select! {
            biased;
            status = child.wait() => break status,
            ctl = control.recv(), if control_open => match ctl {
                Some(Control::Stop { grace }) => {
                    send_terminate(&mut child);
                    if !forced && kill_at.is_none() {
                        kill_at = Some(tokio::time::Instant::now() + grace);
                    }
                }
                None => {
                    // Owner dropped its handle.
                    control_open = false;
                    forced = true;
                    kill_at = None;
                    let _ = child.start_kill();
                }
            },
            () = sleep_until(kill_at) => {
                tracing::warn!(
                    tool = %program,
                    pid = ?child.id(),
                    "Engine still running after grace period; forcing termination"
                );
                forced = true;
                kill_at = None;
                force_kill(&mut child, &program);
            }
        }
    };

    if let Some(handle) = reader.as_mut() {
        if tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut *handle).await.is_err() {
            tracing::debug!(tool = %program, "stderr still open after exit; detaching reader");
            handle.abort();
        }
    }

    let diagnostics: Vec<String> = tail.lock().iter().cloned().collect();
    let report = ExitReport::new(status, forced, diagnostics);
    tracing::debug!(
        tool = %program,
        code = ?report.code,
        signal = ?report.signal,
        forced = report.forced,
        "Engine exited"
    );

    let _ = exit_tx.send(Some(report.clone()));
    let _ = events.send(EngineEvent::Exited(report));
}

/// Sleep until `deadline`, or forever without one.
async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn force_kill(child: &mut Child, program: &str) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(tool = %program, "Failed to kill engine: {e}");
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // `id()` is `None` once reaped, so the signal cannot hit a recycled pid.
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::warn!(pid, "Failed to send SIGTERM to engine: {e}");
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) {
    let _ = child.start_kill();
}

fn looks_like_error(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    ["error", "failed", "invalid", "refused"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Split stderr on `\r` and `\n`: ffmpeg rewrites progress in place with
/// carriage returns.
async fn read_stderr(
    stderr: ChildStderr,
    tail: Arc<Mutex<VecDeque<String>>>,
    events: mpsc::UnboundedSender<EngineEvent>,
    program: String,
) {
    let mut segments = BufReader::new(stderr).split(b'\r');
    let mut last_progress_log: Option<Instant> = None;

    loop {
        let chunk = match segments.next_segment().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(tool = %program, "stderr read error: {e}");
                break;
            }
        };

        for line in String::from_utf8_lossy(&chunk).split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(progress) = Progress::parse(line) {
                if last_progress_log.map_or(true, |t| t.elapsed() >= PROGRESS_LOG_INTERVAL) {
                    tracing::info!(
                        tool = %program,
                        frames = ?progress.frames,
                        fps = ?progress.fps,
                        time = ?progress.timemark,
                        speed = ?progress.speed,
                        "Streaming"
                    );
                    last_progress_log = Some(Instant::now());
                }
                let _ = events.send(EngineEvent::Progress(progress));
                continue;
            }

            if looks_like_error(line) {
                tracing::warn!(tool = %program, "{line}");
            } else {
                tracing::debug!(tool = %program, "{line}");
            }

            let mut tail = tail.lock();
            if tail.len() == DIAGNOSTIC_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }
    }
}
