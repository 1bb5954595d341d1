//! Supervisor configuration

use std::path::PathBuf;
use std::time::Duration;

/// Stream supervisor configuration options
///
/// Concurrency and idle limits are not here: they belong to the camera
/// registry and are read on every operation.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Directory the transcoders write playlists and segments into
    pub streams_dir: PathBuf,

    /// URL prefix under which `streams_dir` is served
    pub public_prefix: String,

    /// How long to wait for the first playlist before giving up
    pub playlist_timeout: Duration,

    /// How often to check for the playlist while waiting
    pub playlist_poll_interval: Duration,

    /// Time between SIGTERM and SIGKILL when stopping a transcoder
    pub kill_grace_period: Duration,

    /// Stream files older than this are removed by the orphan sweep
    pub orphan_max_age: Duration,

    /// Interval of the background maintenance task
    pub maintenance_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            streams_dir: PathBuf::from("public/streams"),
            public_prefix: "/streams".to_string(),
            playlist_timeout: Duration::from_millis(4000),
            playlist_poll_interval: Duration::from_millis(250),
            kill_grace_period: Duration::from_secs(5),
            orphan_max_age: Duration::from_secs(10 * 60),
            maintenance_interval: Duration::from_secs(60),
        }
    }
}

impl SupervisorConfig {
    /// Create a new config writing into `dir`
    pub fn with_streams_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            streams_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Set the output directory
    pub fn streams_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.streams_dir = dir.into();
        self
    }

    /// Set the public URL prefix
    pub fn public_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.public_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Set the playlist wait bound
    pub fn playlist_timeout(mut self, timeout: Duration) -> Self {
        self.playlist_timeout = timeout;
        self
    }

    /// Set the playlist poll interval
    pub fn playlist_poll_interval(mut self, interval: Duration) -> Self {
        self.playlist_poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the SIGTERM to SIGKILL grace period
    pub fn kill_grace_period(mut self, grace: Duration) -> Self {
        self.kill_grace_period = grace;
        self
    }

    /// Set the orphan file age threshold
    pub fn orphan_max_age(mut self, age: Duration) -> Self {
        self.orphan_max_age = age;
        self
    }

    /// Set the maintenance interval
    pub fn maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Public URL of a file inside the streams directory
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SupervisorConfig::default();

        assert_eq!(config.public_prefix, "/streams");
        assert_eq!(config.playlist_timeout, Duration::from_millis(4000));
        assert_eq!(config.playlist_poll_interval, Duration::from_millis(250));
        assert_eq!(config.orphan_max_age, Duration::from_secs(600));
        assert_eq!(config.kill_grace_period, Duration::from_secs(5));
    }

    #[test]
    fn test_with_streams_dir() {
        let config = SupervisorConfig::with_streams_dir("/var/lib/relay");

        assert_eq!(config.streams_dir, PathBuf::from("/var/lib/relay"));
        assert_eq!(config.public_prefix, "/streams");
    }

    #[test]
    fn test_public_url() {
        let config = SupervisorConfig::default().public_prefix("/hls/");

        assert_eq!(config.public_prefix, "/hls");
        assert_eq!(config.public_url("camera_7.m3u8"), "/hls/camera_7.m3u8");
    }

    #[test]
    fn test_intervals_never_zero() {
        let config = SupervisorConfig::default()
            .playlist_poll_interval(Duration::ZERO)
            .maintenance_interval(Duration::ZERO);

        assert_eq!(config.playlist_poll_interval, Duration::from_millis(1));
        assert_eq!(config.maintenance_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = SupervisorConfig::default()
            .streams_dir("/tmp/streams")
            .playlist_timeout(Duration::from_secs(2))
            .kill_grace_period(Duration::from_secs(1))
            .orphan_max_age(Duration::from_secs(30));

        assert_eq!(config.streams_dir, PathBuf::from("/tmp/streams"));
        assert_eq!(config.playlist_timeout, Duration::from_secs(2));
        assert_eq!(config.kill_grace_period, Duration::from_secs(1));
        assert_eq!(config.orphan_max_age, Duration::from_secs(30));
    }
}
