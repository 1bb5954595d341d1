//! Relay configuration from the environment
//!
//! Invalid stream limits fall back to their defaults with a warning rather
//! than refusing to start. Only values the server cannot run without (the
//! bind address, unreadable variables) are errors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::camera::{parse_list, CameraSettings, Credentials, StaticRegistry, StreamLimits};
use crate::process::{FfmpegTranscoder, HlsOptions};
use crate::supervisor::SupervisorConfig;

/// Lowest accepted auto-stop window
pub const MIN_AUTO_STOP: Duration = Duration::from_secs(60);

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_STREAMS_DIR: &str = "./public/streams";
const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not valid unicode")]
    NotUnicode(String),

    #[error("invalid bind address {value:?}: {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Everything the binary needs to assemble a relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub cameras: CameraSettings,
    pub bind_addr: SocketAddr,
    pub streams_dir: PathBuf,
    pub ffmpeg_binary: PathBuf,
}

impl RelayConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key.to_string())),
        })
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        // Empty and whitespace-only values count as unset
        let var = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok(lookup(key)?
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()))
        };
        let list = |key: &str| -> Result<Vec<String>, ConfigError> {
            Ok(var(key)?.map(|v| parse_list(&v)).unwrap_or_default())
        };

        let paths = match var("CAMERA_PATHS")? {
            Some(value) => parse_list(&value),
            None => list("CAMERA_STREAMS")?,
        };

        let credentials = Credentials::new(
            var("USERNAME")?.unwrap_or_else(|| "admin".to_string()),
            var("PASSWORD")?.unwrap_or_else(|| "admin".to_string()),
        );

        let limits = StreamLimits {
            max_concurrent_streams: parse_max_streams(var("MAX_CONCURRENT_STREAMS")?.as_deref()),
            auto_stop: parse_auto_stop(var("STREAM_AUTO_STOP_MS")?.as_deref()),
        };

        let bind_value = var("BIND_ADDR")?.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = parse_bind_addr(&bind_value)?;

        Ok(Self {
            cameras: CameraSettings {
                entries: list("CAMERAS")?,
                names: list("CAMERA_NAMES")?,
                kinds: list("CAMERA_TYPES")?,
                paths,
                credentials,
                limits,
            },
            bind_addr,
            streams_dir: var("STREAMS_DIR")?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STREAMS_DIR)),
            ffmpeg_binary: var("FFMPEG_BINARY")?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG_BINARY)),
        })
    }

    /// Override the bind address
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Override the output directory
    pub fn streams_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.streams_dir = dir.into();
        self
    }

    /// Build the camera registry
    pub fn registry(&self) -> StaticRegistry {
        StaticRegistry::from_settings(self.cameras.clone())
    }

    /// Build the supervisor configuration
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig::with_streams_dir(&self.streams_dir)
    }

    /// Build the ffmpeg transcoder
    pub fn transcoder(&self) -> FfmpegTranscoder {
        FfmpegTranscoder::new(&self.ffmpeg_binary, HlsOptions::default())
    }
}

/// Parse a bind address
pub fn parse_bind_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidBindAddr {
            value: value.to_string(),
            source,
        })
}

fn parse_max_streams(value: Option<&str>) -> usize {
    let default = StreamLimits::default().max_concurrent_streams;
    let Some(value) = value else {
        return default;
    };

    match value.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 1.0 => n.floor() as usize,
        _ => {
            tracing::warn!(value = value, default = default, "Invalid MAX_CONCURRENT_STREAMS, using default");
            default
        }
    }
}

fn parse_auto_stop(value: Option<&str>) -> Duration {
    let default = StreamLimits::default().auto_stop;
    let Some(value) = value else {
        return default;
    };

    match value.parse::<f64>() {
        Ok(ms) if ms.is_finite() && ms >= MIN_AUTO_STOP.as_millis() as f64 => {
            Duration::from_millis(ms.floor() as u64)
        }
        _ => {
            tracing::warn!(
                value = value,
                default_ms = default.as_millis() as u64,
                "Invalid STREAM_AUTO_STOP_MS (minimum 60000), using default"
            );
            default
        }
    }
}
