//! Supervisor error types
//!
//! Every failure of a stream operation is reported as a [`StreamError`].
//! Errors are `Clone` because one start outcome is shared by every caller
//! that joined it.

use std::time::Duration;

use crate::camera::CameraId;
use crate::process::LaunchError;

/// Why a stream was stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Explicit stop request
    Manual,
    /// Idle longer than the auto-stop window
    Timeout,
    /// The process could no longer be monitored
    Error,
    /// Supervisor teardown
    Shutdown,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StopReason::Manual => "manual",
            StopReason::Timeout => "timeout",
            StopReason::Error => "error",
            StopReason::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Error type for stream operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The registry does not know the camera
    #[error("camera {0} not found")]
    NotFound(CameraId),

    /// Running plus starting streams already at the limit
    #[error("concurrent stream limit reached ({limit})")]
    ResourceExhausted { limit: usize },

    /// The transcoder could not be launched, or died before producing output
    #[error("{message}")]
    LaunchFailure {
        /// Binary missing: retrying will not help until it is installed
        missing_binary: bool,
        message: String,
    },

    /// The transcoder ran but never wrote a playlist
    #[error("playlist for camera {camera_id} not ready after {}ms", .waited.as_millis())]
    GatewayTimeout { camera_id: CameraId, waited: Duration },

    /// A pending start was stopped before it completed
    #[error("stream start for camera {camera_id} cancelled ({reason})")]
    Cancelled { camera_id: CameraId, reason: StopReason },

    /// The supervisor no longer accepts new streams
    #[error("stream supervisor is shutting down")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

impl StreamError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StreamError::NotFound(_) => 404,
            StreamError::ResourceExhausted { .. } => 429,
            StreamError::LaunchFailure { .. } => 503,
            StreamError::GatewayTimeout { .. } => 504,
            // Client closed request
            StreamError::Cancelled {
                reason: StopReason::Manual,
                ..
            } => 499,
            StreamError::Cancelled { .. } => 503,
            StreamError::ShuttingDown => 503,
            StreamError::Internal(_) => 500,
        }
    }

    /// Whether the same request may succeed if simply retried later
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::NotFound(_) => false,
            StreamError::LaunchFailure { missing_binary, .. } => !missing_binary,
            StreamError::ShuttingDown => false,
            StreamError::ResourceExhausted { .. }
            | StreamError::GatewayTimeout { .. }
            | StreamError::Cancelled { .. }
            | StreamError::Internal(_) => true,
        }
    }
}

impl From<LaunchError> for StreamError {
    fn from(e: LaunchError) -> Self {
        let missing_binary = matches!(e, LaunchError::MissingBinary { .. });
        StreamError::LaunchFailure {
            missing_binary,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StreamError::NotFound(1).status_code(), 404);
        assert_eq!(StreamError::ResourceExhausted { limit: 2 }.status_code(), 429);
        assert_eq!(
            StreamError::GatewayTimeout {
                camera_id: 1,
                waited: Duration::from_secs(4)
            }
            .status_code(),
            504
        );
        assert_eq!(StreamError::Internal("x".into()).status_code(), 500);
        assert_eq!(StreamError::ShuttingDown.status_code(), 503);
    }

    #[test]
    fn test_cancelled_status_depends_on_reason() {
        let manual = StreamError::Cancelled {
            camera_id: 3,
            reason: StopReason::Manual,
        };
        let shutdown = StreamError::Cancelled {
            camera_id: 3,
            reason: StopReason::Shutdown,
        };

        assert_eq!(manual.status_code(), 499);
        assert_eq!(shutdown.status_code(), 503);
        assert_eq!(
            shutdown.to_string(),
            "stream start for camera 3 cancelled (shutdown)"
        );
    }

    #[test]
    fn test_launch_error_conversion() {
        let missing: StreamError = LaunchError::MissingBinary {
            program: "ffmpeg".into(),
        }
        .into();
        let spawn: StreamError = LaunchError::Spawn {
            program: "ffmpeg".into(),
            message: "Permission denied".into(),
        }
        .into();

        assert_eq!(missing.status_code(), 503);
        assert!(!missing.is_retryable());
        assert_eq!(spawn.status_code(), 503);
        assert!(spawn.is_retryable());
        assert_eq!(missing.to_string(), "transcoder binary not found: ffmpeg");
    }

    #[test]
    fn test_timeout_message() {
        let err = StreamError::GatewayTimeout {
            camera_id: 7,
            waited: Duration::from_millis(4000),
        };
        assert_eq!(err.to_string(), "playlist for camera 7 not ready after 4000ms");
    }
}
