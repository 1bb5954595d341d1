//! Camera registry
//!
//! The supervisor only sees the [`CameraRegistry`] trait. [`StaticRegistry`]
//! is the implementation used by the binary; it is built from comma-separated
//! lists as found in the process environment.

use std::collections::HashSet;

use url::Url;

use super::descriptor::{CameraDescriptor, CameraId, CameraKind, Credentials, StreamLimits};

/// Default RTSP port when an entry does not name one
pub const DEFAULT_RTSP_PORT: u16 = 554;

/// Source of camera descriptors, credentials and stream limits
pub trait CameraRegistry: Send + Sync + 'static {
    /// Resolve a camera id to its descriptor
    fn resolve(&self, id: CameraId) -> Option<CameraDescriptor>;

    /// Credentials used to build source URLs
    fn credentials(&self) -> Credentials;

    /// Concurrency and idle limits
    fn limits(&self) -> StreamLimits;

    /// All known cameras, ordered by id
    fn cameras(&self) -> Vec<CameraDescriptor>;
}

/// Raw camera settings, one list entry per camera
#[derive(Debug, Clone, Default)]
pub struct CameraSettings {
    /// `host`, `host:port`, `[v6]:port` or `rtsp://host:port/path`
    pub entries: Vec<String>,
    pub names: Vec<String>,
    pub kinds: Vec<String>,
    pub paths: Vec<String>,
    pub credentials: Credentials,
    pub limits: StreamLimits,
}

/// Registry over a fixed camera list
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    cameras: Vec<CameraDescriptor>,
    credentials: Credentials,
    limits: StreamLimits,
}

impl StaticRegistry {
    /// Create a registry from already-built descriptors
    pub fn new(
        cameras: Vec<CameraDescriptor>,
        credentials: Credentials,
        limits: StreamLimits,
    ) -> Self {
        Self {
            cameras,
            credentials,
            limits,
        }
    }

    /// Build the camera list from raw settings
    ///
    /// Invalid and duplicate entries are skipped with a warning. Ids are
    /// assigned from the entry position, starting at 1, so skipping an entry
    /// leaves a gap rather than renumbering the cameras after it.
    pub fn from_settings(settings: CameraSettings) -> Self {
        if settings.entries.is_empty() {
            tracing::warn!("No cameras configured, set CAMERAS to enable streams");
        }
        for (list, len) in [
            ("CAMERA_NAMES", settings.names.len()),
            ("CAMERA_TYPES", settings.kinds.len()),
            ("CAMERA_PATHS", settings.paths.len()),
        ] {
            if len > 0 && len != settings.entries.len() {
                tracing::warn!(
                    list = list,
                    entries = settings.entries.len(),
                    values = len,
                    "List length differs from camera count, missing values use defaults"
                );
            }
        }

        let mut seen = HashSet::new();
        let mut cameras = Vec::with_capacity(settings.entries.len());

        for (index, raw) in settings.entries.iter().enumerate() {
            let Some(entry) = parse_entry(raw) else {
                tracing::warn!(entry = %raw, "Invalid camera entry ignored");
                continue;
            };

            let dedupe_key = format!("{}:{}", entry.host, entry.port);
            if !seen.insert(dedupe_key.clone()) {
                tracing::warn!(camera = %dedupe_key, "Duplicate camera ignored");
                continue;
            }

            let kind = settings
                .kinds
                .get(index)
                .map(|k| CameraKind::parse(k))
                .unwrap_or_default();
            let name = settings
                .names
                .get(index)
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("Camera {}", index + 1));
            let stream_path = settings
                .paths
                .get(index)
                .filter(|p| !p.trim().is_empty())
                .map(|p| normalize_path(p))
                .or(entry.path)
                .unwrap_or_else(|| kind.default_path().to_string());

            cameras.push(CameraDescriptor {
                id: (index + 1) as CameraId,
                name,
                kind,
                host: entry.host,
                port: entry.port,
                stream_path,
            });
        }

        Self::new(cameras, settings.credentials, settings.limits)
    }
}

impl CameraRegistry for StaticRegistry {
    fn resolve(&self, id: CameraId) -> Option<CameraDescriptor> {
        self.cameras.iter().find(|c| c.id == id).cloned()
    }

    fn credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    fn limits(&self) -> StreamLimits {
        self.limits
    }

    fn cameras(&self) -> Vec<CameraDescriptor> {
        self.cameras.clone()
    }
}

/// Split a comma-separated list, dropping empty items
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedEntry {
    host: String,
    port: u16,
    path: Option<String>,
}

fn parse_entry(raw: &str) -> Option<ParsedEntry> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains("://") {
        let url = Url::parse(trimmed).ok()?;
        let host = url.host_str().filter(|h| !h.is_empty())?;
        let path = match (url.path(), url.query()) {
            ("" | "/", None) => None,
            (p, None) => Some(normalize_path(p)),
            (p, Some(q)) => Some(normalize_path(&format!("{}?{}", p, q))),
        };

        return Some(ParsedEntry {
            host: strip_brackets(host),
            port: url.port().filter(|p| *p > 0).unwrap_or(DEFAULT_RTSP_PORT),
            path,
        });
    }

    let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = match after.strip_prefix(':') {
            Some(p) => Some(p),
            None if after.is_empty() => None,
            None => return None,
        };
        (host, port)
    } else {
        match trimmed.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (trimmed, None),
        }
    };

    if host.trim().is_empty() {
        return None;
    }

    let port = match port {
        Some(p) => {
            if !p.chars().all(|c| c.is_ascii_digit()) || p.is_empty() {
                return None;
            }
            match p.parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    tracing::warn!(entry = %trimmed, "Invalid port, using default 554");
                    DEFAULT_RTSP_PORT
                }
            }
        }
        None => DEFAULT_RTSP_PORT,
    };

    Some(ParsedEntry {
        host: strip_brackets(host),
        port,
        path: None,
    })
}

fn strip_brackets(host: &str) -> String {
    host.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        "/live".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(entries: &[&str]) -> CameraSettings {
        CameraSettings {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_host_only() {
        let entry = parse_entry("10.0.0.7").unwrap();
        assert_eq!(entry.host, "10.0.0.7");
        assert_eq!(entry.port, 554);
        assert!(entry.path.is_none());
    }

    #[test]
    fn test_parse_host_port() {
        let entry = parse_entry("10.0.0.8:8554").unwrap();
        assert_eq!(entry.host, "10.0.0.8");
        assert_eq!(entry.port, 8554);
    }

    #[test]
    fn test_parse_ipv6() {
        let entry = parse_entry("[fe80::1]:8554").unwrap();
        assert_eq!(entry.host, "fe80::1");
        assert_eq!(entry.port, 8554);
    }

    #[test]
    fn test_parse_url_with_path() {
        let entry = parse_entry("rtsp://192.168.1.20:10554/cam/realmonitor?channel=1").unwrap();
        assert_eq!(entry.host, "192.168.1.20");
        assert_eq!(entry.port, 10554);
        assert_eq!(entry.path.as_deref(), Some("/cam/realmonitor?channel=1"));
    }

    #[test]
    fn test_parse_url_default_port() {
        let entry = parse_entry("rtsp://cam.local").unwrap();
        assert_eq!(entry.port, 554);
        assert!(entry.path.is_none());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_entry("").is_none());
        assert!(parse_entry(":554").is_none());
        assert!(parse_entry("host:abc").is_none());
        assert!(parse_entry("rtsp://").is_none());
    }

    #[test]
    fn test_zero_port_uses_default() {
        assert_eq!(parse_entry("host:0").unwrap().port, 554);
    }

    #[test]
    fn test_registry_defaults() {
        let registry = StaticRegistry::from_settings(settings(&["10.0.0.1", "10.0.0.2:8554"]));

        let first = registry.resolve(1).unwrap();
        assert_eq!(first.name, "Camera 1");
        assert_eq!(first.kind, CameraKind::Intelbras);
        assert_eq!(first.stream_path, "/live/mpeg4");

        let second = registry.resolve(2).unwrap();
        assert_eq!(second.port, 8554);
        assert!(registry.resolve(3).is_none());
        assert!(registry.resolve(0).is_none());
    }

    #[test]
    fn test_registry_names_kinds_paths() {
        let mut s = settings(&["10.0.0.1", "10.0.0.2", "rtsp://10.0.0.3/from/url"]);
        s.names = vec!["Front".into(), "Back".into()];
        s.kinds = vec!["tapo".into(), "weird".into(), "tapo".into()];
        s.paths = vec!["".into(), "custom".into()];
        let registry = StaticRegistry::from_settings(s);

        let front = registry.resolve(1).unwrap();
        assert_eq!(front.name, "Front");
        assert_eq!(front.stream_path, "/stream1");

        let back = registry.resolve(2).unwrap();
        assert_eq!(back.kind, CameraKind::Generic);
        assert_eq!(back.stream_path, "/custom");

        let third = registry.resolve(3).unwrap();
        assert_eq!(third.name, "Camera 3");
        assert_eq!(third.stream_path, "/from/url");
    }

    #[test]
    fn test_registry_skips_duplicates_and_invalid() {
        let registry =
            StaticRegistry::from_settings(settings(&["10.0.0.1", "bad:port", "10.0.0.1:554", "10.0.0.4"]));

        let ids: Vec<_> = registry.cameras().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }
}
