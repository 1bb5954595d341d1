//! Transcoder processes
//!
//! [`Transcoder`] builds the command for a camera, [`ProcessHandle`] runs and
//! monitors it. Monitors never touch supervisor state directly; they report
//! through a [`TaggedEvent`] channel instead.

pub mod command;
pub mod handle;

pub use command::{FfmpegTranscoder, HlsOptions, TranscodeJob, Transcoder};
pub use handle::{
    EventSender, ExitInfo, LaunchError, ProcessEvent, ProcessHandle, ProcessTag, TaggedEvent,
};
