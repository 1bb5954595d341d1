//! On-demand RTSP to HLS relay
//!
//! Cameras are pulled over RTSP and repackaged as HLS by one external
//! transcoder process per camera. Processes are started when a client asks
//! for a camera, shared by every client watching it, and stopped once nobody
//! has asked for the stream for a while.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hls_relay::camera::{CameraSettings, StaticRegistry};
//! use hls_relay::process::FfmpegTranscoder;
//! use hls_relay::supervisor::{StreamSupervisor, SupervisorConfig};
//!
//! # async fn run() -> Result<(), hls_relay::supervisor::StreamError> {
//! let registry = StaticRegistry::from_settings(CameraSettings {
//!     entries: vec!["192.168.1.50".to_string()],
//!     ..Default::default()
//! });
//! let supervisor = StreamSupervisor::new(
//!     SupervisorConfig::with_streams_dir("public/streams"),
//!     Arc::new(registry),
//!     Arc::new(FfmpegTranscoder::default()),
//! );
//!
//! let stream = supervisor.ensure_stream(1).await?;
//! println!("playlist at {}", stream.playlist_url);
//!
//! supervisor.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod camera;
pub mod config;
pub mod process;
pub mod supervisor;

pub use config::{ConfigError, RelayConfig};
pub use supervisor::{EnsureOutcome, StopReason, StreamError, StreamSupervisor, SupervisorConfig};
