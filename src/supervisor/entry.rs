//! Stream slot and state types
//!
//! This module defines the per-camera state stored in the supervisor table.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::camera::CameraId;
use crate::process::ProcessHandle;

use super::error::{StopReason, StreamError};

/// Result of a successful `ensure_stream`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureOutcome {
    /// Public URL of the playlist (`/streams/camera_7.m3u8`)
    pub playlist_url: String,
    /// Source URL with credentials masked
    pub sanitized_source_url: String,
    /// False only for the caller whose request spawned the process
    pub already_running: bool,
}

pub(super) type StartResult = Result<EnsureOutcome, StreamError>;

/// Shared outcome of a pending start, set exactly once
pub(super) type OutcomeCell = Arc<watch::Sender<Option<StartResult>>>;

/// Visible state of a table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Process launched, waiting for the first playlist
    Starting,
    /// Playlist produced, stream is live
    Running,
}

/// Per-camera table slot. A missing map entry is the absent state.
pub(super) enum StreamSlot {
    Starting(PendingStart),
    Running(StreamRecord),
}

/// A start that has been admitted but has not produced a playlist yet
pub(super) struct PendingStart {
    pub generation: u64,
    pub outcome: OutcomeCell,
    /// Attached once the spawn succeeded
    pub process: Option<ProcessHandle>,
    pub requested_at: Instant,
}

impl PendingStart {
    pub fn new(generation: u64) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            generation,
            outcome: Arc::new(tx),
            process: None,
            requested_at: Instant::now(),
        }
    }

    /// Cancel the start: terminate the process and fail every waiter
    pub fn cancel(self, camera_id: CameraId, reason: StopReason) {
        if let Some(ref process) = self.process {
            process.terminate();
        }
        settle(&self.outcome, Err(StreamError::Cancelled { camera_id, reason }));
    }
}

/// Publish a start outcome unless one was already published
pub(super) fn settle(cell: &OutcomeCell, result: StartResult) -> bool {
    cell.send_if_modified(|current| {
        if current.is_some() {
            return false;
        }
        *current = Some(result);
        true
    })
}

/// A live stream
pub struct StreamRecord {
    pub camera_id: CameraId,
    pub generation: u64,
    pub process: ProcessHandle,
    pub playlist_path: PathBuf,
    pub segment_pattern: PathBuf,
    pub playlist_url: String,
    pub started_at: Instant,
    pub last_accessed_at: Instant,
    pub(super) auto_stop: Option<JoinHandle<()>>,
}

impl StreamRecord {
    /// Mark the stream as accessed, pushing its auto-stop deadline forward
    pub fn touch(&mut self) {
        self.last_accessed_at = Instant::now();
    }

    /// Time since the last access
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed_at)
    }

    /// Build the caller-facing outcome. The masked source URL comes from the
    /// registry on every call rather than from the record.
    pub fn outcome(&self, sanitized_source_url: String, already_running: bool) -> EnsureOutcome {
        EnsureOutcome {
            playlist_url: self.playlist_url.clone(),
            sanitized_source_url,
            already_running,
        }
    }
}

impl Drop for StreamRecord {
    fn drop(&mut self) {
        if let Some(timer) = self.auto_stop.take() {
            timer.abort();
        }
    }
}

impl StreamSlot {
    pub fn state(&self) -> SlotState {
        match self {
            StreamSlot::Starting(_) => SlotState::Starting,
            StreamSlot::Running(_) => SlotState::Running,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            StreamSlot::Starting(pending) => pending.generation,
            StreamSlot::Running(record) => record.generation,
        }
    }
}

/// Statistics for a stream
#[derive(Debug, Clone)]
pub struct StreamStats {
    pub camera_id: CameraId,
    pub state: SlotState,
    /// Transcoder pid, once spawned
    pub pid: Option<u32>,
    /// Time since the start was requested (starting) or completed (running)
    pub uptime: Duration,
    /// Time since the last access; zero while starting
    pub idle: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_first_writer_wins() {
        let pending = PendingStart::new(1);
        let rx = pending.outcome.subscribe();

        assert!(settle(&pending.outcome, Err(StreamError::Internal("first".into()))));
        assert!(!settle(&pending.outcome, Err(StreamError::Internal("second".into()))));

        assert_eq!(
            *rx.borrow(),
            Some(Err(StreamError::Internal("first".into())))
        );
    }

    #[test]
    fn test_cancel_without_process() {
        let pending = PendingStart::new(4);
        let rx = pending.outcome.subscribe();

        pending.cancel(9, StopReason::Manual);

        assert_eq!(
            *rx.borrow(),
            Some(Err(StreamError::Cancelled {
                camera_id: 9,
                reason: StopReason::Manual
            }))
        );
    }

    #[test]
    fn test_slot_state() {
        let slot = StreamSlot::Starting(PendingStart::new(3));

        assert_eq!(slot.state(), SlotState::Starting);
        assert_eq!(slot.generation(), 3);
    }
}
