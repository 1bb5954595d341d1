//! Handle to a running transcoder process
//!
//! The child itself is owned by a monitor task. Callers hold a cheap,
//! cloneable [`ProcessHandle`] that can request termination and await exit,
//! while lifecycle events flow to the supervisor over a channel.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::camera::CameraId;

/// Errors raised while launching a transcoder
#[derive(Debug, Clone, thiserror::Error)]
pub enum LaunchError {
    /// The transcoder binary does not exist; permanent until installed
    #[error("transcoder binary not found: {program}")]
    MissingBinary { program: String },

    /// Any other spawn failure (permissions, resource limits, ...)
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },
}

impl LaunchError {
    fn from_io(program: String, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            LaunchError::MissingBinary { program }
        } else {
            LaunchError::Spawn {
                program,
                message: err.to_string(),
            }
        }
    }
}

/// How a process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl std::fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Lifecycle event emitted by a process monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// The process was launched
    Spawned { pid: Option<u32> },
    /// One line of diagnostic output
    StderrLine(String),
    /// The process ended
    Exited(ExitInfo),
    /// Waiting on the process failed; its state is unknown
    Failed(String),
}

/// Identifies which process an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessTag {
    pub camera_id: CameraId,
    /// Unique per spawn, so events from an old process never touch a newer one
    pub generation: u64,
}

/// Event plus the process it came from
#[derive(Debug, Clone)]
pub struct TaggedEvent {
    pub tag: ProcessTag,
    pub event: ProcessEvent,
}

/// Sender half used by process monitors
pub type EventSender = mpsc::UnboundedSender<TaggedEvent>;

/// Cloneable control handle for one transcoder process
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    tag: ProcessTag,
    pid: Option<u32>,
    terminate: CancellationToken,
    exited: CancellationToken,
    /// Set by the monitor just before `exited` fires
    status: Arc<OnceLock<ExitInfo>>,
}

impl ProcessHandle {
    /// Spawn `command` and start monitoring it
    ///
    /// Stdin and stdout are discarded and stderr is forwarded line by line as
    /// [`ProcessEvent::StderrLine`]. A termination request sends SIGTERM and
    /// escalates to SIGKILL once `kill_grace` has passed.
    pub fn spawn(
        mut command: Command,
        tag: ProcessTag,
        kill_grace: Duration,
        events: EventSender,
    ) -> Result<Self, LaunchError> {
        let program = command
            .as_std()
            .get_program()
            .to_string_lossy()
            .into_owned();

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| LaunchError::from_io(program, e))?;
        let pid = child.id();

        let _ = events.send(TaggedEvent {
            tag,
            event: ProcessEvent::Spawned { pid },
        });

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, tag, events.clone()));
        }

        let handle = Self {
            tag,
            pid,
            terminate: CancellationToken::new(),
            exited: CancellationToken::new(),
            status: Arc::new(OnceLock::new()),
        };

        tokio::spawn(monitor(child, tag, kill_grace, handle.clone(), events));

        Ok(handle)
    }

    pub fn tag(&self) -> ProcessTag {
        self.tag
    }

    /// OS process id, if the platform reported one
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Request graceful termination. Idempotent and non-blocking.
    pub fn terminate(&self) {
        self.terminate.cancel();
    }

    /// Whether termination has been requested
    pub fn is_terminating(&self) -> bool {
        self.terminate.is_cancelled()
    }

    /// Whether the process has been reaped
    pub fn has_exited(&self) -> bool {
        self.exited.is_cancelled()
    }

    /// Wait until the process has been reaped
    pub async fn wait_exit(&self) {
        self.exited.cancelled().await;
    }

    /// Exit status, once reaped. None if waiting on the child failed.
    pub fn exit_info(&self) -> Option<ExitInfo> {
        self.status.get().copied()
    }
}

async fn forward_stderr(stderr: ChildStderr, tag: ProcessTag, events: EventSender) {
    let mut lines = BufReader::new(stderr).lines();

    // Keep draining even when nobody listens so the pipe never blocks the child
    while let Ok(Some(line)) = lines.next_line().await {
        let _ = events.send(TaggedEvent {
            tag,
            event: ProcessEvent::StderrLine(line),
        });
    }
}

async fn monitor(
    mut child: Child,
    tag: ProcessTag,
    kill_grace: Duration,
    handle: ProcessHandle,
    events: EventSender,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = handle.terminate.cancelled() => {
            send_sigterm(&mut child);
            match tokio::time::timeout(kill_grace, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!(
                        camera_id = tag.camera_id,
                        grace_ms = kill_grace.as_millis() as u64,
                        "Transcoder ignored SIGTERM, killing"
                    );
                    let _ = child.start_kill();
                    child.wait().await
                }
            }
        }
    };

    let event = match status {
        Ok(status) => {
            let info = ExitInfo::from(status);
            let _ = handle.status.set(info);
            ProcessEvent::Exited(info)
        }
        Err(e) => ProcessEvent::Failed(e.to_string()),
    };

    // Observers of the event must already see the handle as exited
    handle.exited.cancel();
    let _ = events.send(TaggedEvent { tag, event });
}

#[cfg(unix)]
fn send_sigterm(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // No id means the child was already reaped
    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::debug!(pid = pid, error = %e, "SIGTERM failed, killing");
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) {
    let _ = child.start_kill();
}
