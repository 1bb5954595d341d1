//! Stream supervisor
//!
//! The supervisor owns one transcoder process per camera and decides when
//! those processes start and stop. Requests for the same camera share one
//! process; a request that arrives while a start is in flight joins it.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<StreamSupervisor>
//!                   ┌───────────────────────────────┐
//!                   │ streams: Mutex<HashMap<Id,    │
//!                   │   Starting(PendingStart)      │
//!                   │ | Running(StreamRecord)       │
//!                   │ >>                            │
//!                   └───────┬───────────────▲───────┘
//!                           │               │ TaggedEvent
//!            ensure_stream()│               │ (camera, generation)
//!                           ▼               │
//!                    [drive_start]    [ProcessHandle monitor]
//!                    spawn, poll for        │ wait / SIGTERM / SIGKILL
//!                    playlist, promote      ▼
//!                           │          transcoder process
//!                           └──► watch::Sender<Option<Result>>
//!                                 (shared with joining callers)
//! ```
//!
//! # Slot lifecycle
//!
//! A camera with no map entry is absent. `ensure_stream` admits it as
//! `Starting`, the start task promotes it to `Running` once the playlist
//! exists, and a stop, idle timeout, process exit or shutdown removes it.
//! Each spawn gets a fresh generation number so that late events from an
//! old process never touch a newer slot for the same camera.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;
pub mod sweeper;

pub use config::SupervisorConfig;
pub use entry::{EnsureOutcome, SlotState, StreamRecord, StreamStats};
pub use error::{StopReason, StreamError};
pub use store::StreamSupervisor;
pub use sweeper::{is_stream_file, sweep_orphaned_files, ActiveStreams, MaintenanceReport};
